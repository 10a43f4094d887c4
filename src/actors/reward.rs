// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::bigint::{bigint_ser, BigInt};
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::StoragePower;
use fvm_shared::smooth::FilterEstimate;
use serde::Serialize;

use crate::actors::monies;
use crate::actors::{load_state, require_version, ActorError, ActorKind, ActorVersion};
use crate::state_tree::ActorState;

/// Integral of power over time.
pub type Spacetime = BigInt;

/// Reward actor state. Owns the chain's block reward accounting and the
/// economic formulas derived from it.
#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum State {
    V8(v8::State),
    V9(v9::State),
}

impl State {
    pub fn load<BS>(store: &BS, actor: &ActorState) -> Result<State, ActorError>
    where
        BS: Blockstore,
    {
        match require_version(ActorKind::Reward, &actor.code)? {
            ActorVersion::V8 => load_state(store, &actor.state).map(State::V8),
            ActorVersion::V9 => load_state(store, &actor.state).map(State::V9),
        }
    }

    /// Total reward paid out to storage power since genesis.
    pub fn total_storage_power_reward(&self) -> TokenAmount {
        match self {
            State::V8(st) => st.total_storage_power_reward.clone(),
            State::V9(st) => st.total_storage_power_reward.clone(),
        }
    }

    fn this_epoch_reward_smoothed(&self) -> &FilterEstimate {
        match self {
            State::V8(st) => &st.this_epoch_reward_smoothed,
            State::V9(st) => &st.this_epoch_reward_smoothed,
        }
    }

    fn this_epoch_baseline_power(&self) -> &StoragePower {
        match self {
            State::V8(st) => &st.this_epoch_baseline_power,
            State::V9(st) => &st.this_epoch_baseline_power,
        }
    }

    /// The deposit required to pre-commit a sector of the given
    /// quality-adjusted power, under current network conditions.
    pub fn pre_commit_deposit_for_power(
        &self,
        network_qa_power: &FilterEstimate,
        sector_weight: &StoragePower,
    ) -> TokenAmount {
        monies::pre_commit_deposit_for_power(
            self.this_epoch_reward_smoothed(),
            network_qa_power,
            sector_weight,
        )
    }

    /// The pledge collateral required to commit a sector of the given
    /// quality-adjusted power. `_network_total_pledge` is kept for interface
    /// compatibility with older formula generations.
    pub fn initial_pledge_for_power(
        &self,
        sector_weight: &StoragePower,
        _network_total_pledge: &TokenAmount,
        network_qa_power: &FilterEstimate,
        circ_supply: &TokenAmount,
    ) -> TokenAmount {
        monies::initial_pledge_for_power(
            sector_weight,
            self.this_epoch_baseline_power(),
            self.this_epoch_reward_smoothed(),
            network_qa_power,
            circ_supply,
        )
    }
}

pub mod v8 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        /// Target cumulative-sum of baseline power.
        #[serde(with = "bigint_ser")]
        pub cumsum_baseline: Spacetime,
        /// Cumulative sum of network power capped by the baseline.
        #[serde(with = "bigint_ser")]
        pub cumsum_realized: Spacetime,
        /// Ticks by one per epoch in which the network exceeds the baseline.
        pub effective_network_time: ChainEpoch,
        /// Baseline power at the effective network time.
        #[serde(with = "bigint_ser")]
        pub effective_baseline_power: StoragePower,
        /// The reward to be paid in per-winner shares this epoch.
        pub this_epoch_reward: TokenAmount,
        pub this_epoch_reward_smoothed: FilterEstimate,
        /// The baseline power the network must meet this epoch to reach the
        /// full reward issuance rate.
        #[serde(with = "bigint_ser")]
        pub this_epoch_baseline_power: StoragePower,
        pub epoch: ChainEpoch,
        /// Tracks the total FIL awarded to block miners.
        pub total_storage_power_reward: TokenAmount,
        pub simple_total: TokenAmount,
        pub baseline_total: TokenAmount,
    }
}

pub mod v9 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        #[serde(with = "bigint_ser")]
        pub cumsum_baseline: Spacetime,
        #[serde(with = "bigint_ser")]
        pub cumsum_realized: Spacetime,
        pub effective_network_time: ChainEpoch,
        #[serde(with = "bigint_ser")]
        pub effective_baseline_power: StoragePower,
        pub this_epoch_reward: TokenAmount,
        pub this_epoch_reward_smoothed: FilterEstimate,
        #[serde(with = "bigint_ser")]
        pub this_epoch_baseline_power: StoragePower,
        pub epoch: ChainEpoch,
        pub total_storage_power_reward: TokenAmount,
        pub simple_total: TokenAmount,
        pub baseline_total: TokenAmount,
    }
}
