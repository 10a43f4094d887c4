// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_hamt::{BytesKey, Hamt};
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::StoragePower;
use fvm_shared::smooth::FilterEstimate;
use serde::{Deserialize, Serialize};

use crate::actors::init::HAMT_BIT_WIDTH;
use crate::actors::{load_state, require_version, ActorError, ActorKind, ActorVersion};
use crate::state_tree::ActorState;

/// Storage power actor state.
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
        match require_version(ActorKind::Power, &actor.code)? {
            ActorVersion::V8 => load_state(store, &actor.state).map(State::V8),
            ActorVersion::V9 => load_state(store, &actor.state).map(State::V9),
        }
    }

    /// Returns the total network power claim.
    pub fn total_power(&self) -> Claim {
        match self {
            State::V8(st) => Claim {
                raw_byte_power: st.total_raw_byte_power.clone(),
                quality_adj_power: st.total_quality_adj_power.clone(),
            },
            State::V9(st) => Claim {
                raw_byte_power: st.total_raw_byte_power.clone(),
                quality_adj_power: st.total_quality_adj_power.clone(),
            },
        }
    }

    /// Returns `this_epoch_qa_power_smoothed` from the state: the smoothed
    /// (time-averaged) total quality-adjusted power estimate the economic
    /// formulas consume.
    pub fn total_power_smoothed(&self) -> FilterEstimate {
        match self {
            State::V8(st) => st.this_epoch_qa_power_smoothed.clone(),
            State::V9(st) => st.this_epoch_qa_power_smoothed.clone(),
        }
    }

    /// Returns the total pledge currently locked network-wide.
    pub fn total_locked(&self) -> TokenAmount {
        match self {
            State::V8(st) => st.total_pledge_collateral.clone(),
            State::V9(st) => st.total_pledge_collateral.clone(),
        }
    }

    /// Loads the power claim for a given miner, if one exists.
    pub fn miner_power<BS: Blockstore>(
        &self,
        store: &BS,
        miner: &Address,
    ) -> anyhow::Result<Option<Claim>> {
        let claims = match self {
            State::V8(st) => &st.claims,
            State::V9(st) => &st.claims,
        };
        let claims: Hamt<_, OnChainClaim> =
            Hamt::load_with_bit_width(claims, store, HAMT_BIT_WIDTH)
                .context("failed to load power actor claims")?;
        Ok(claims
            .get(&BytesKey(miner.to_bytes()))?
            .map(|claim| Claim {
                raw_byte_power: claim.raw_byte_power.clone(),
                quality_adj_power: claim.quality_adj_power.clone(),
            }))
    }

    pub fn miner_count(&self) -> i64 {
        match self {
            State::V8(st) => st.miner_count,
            State::V9(st) => st.miner_count,
        }
    }
}

/// A miner's (or the network's) power tallies.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Sum of raw byte power for the sectors.
    #[serde(with = "bigint_ser")]
    pub raw_byte_power: StoragePower,
    /// Sum of quality adjusted power for the sectors.
    #[serde(with = "bigint_ser")]
    pub quality_adj_power: StoragePower,
}

/// The on-chain claim record, as stored in the claims map.
#[derive(Debug, Clone, Serialize_tuple, Deserialize_tuple)]
pub struct OnChainClaim {
    /// Miner's proof type used to determine minimum miner size.
    pub window_post_proof_type: fvm_shared::sector::RegisteredPoStProof,
    #[serde(with = "bigint_ser")]
    pub raw_byte_power: StoragePower,
    #[serde(with = "bigint_ser")]
    pub quality_adj_power: StoragePower,
}

pub mod v8 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        #[serde(with = "bigint_ser")]
        pub total_raw_byte_power: StoragePower,
        #[serde(with = "bigint_ser")]
        pub total_bytes_committed: StoragePower,
        #[serde(with = "bigint_ser")]
        pub total_quality_adj_power: StoragePower,
        #[serde(with = "bigint_ser")]
        pub total_qa_bytes_committed: StoragePower,
        pub total_pledge_collateral: TokenAmount,
        #[serde(with = "bigint_ser")]
        pub this_epoch_raw_byte_power: StoragePower,
        #[serde(with = "bigint_ser")]
        pub this_epoch_quality_adj_power: StoragePower,
        pub this_epoch_pledge_collateral: TokenAmount,
        pub this_epoch_qa_power_smoothed: FilterEstimate,
        pub first_cron_epoch: ChainEpoch,
        pub miner_count: i64,
        pub miner_above_min_power_count: i64,
        /// Queue of power cron events, by trigger epoch.
        pub cron_event_queue: Cid,
        /// Map of miner claims, keyed by miner address.
        pub claims: Cid,
        pub proof_validation_batch: Option<Cid>,
    }
}

pub mod v9 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        #[serde(with = "bigint_ser")]
        pub total_raw_byte_power: StoragePower,
        #[serde(with = "bigint_ser")]
        pub total_bytes_committed: StoragePower,
        #[serde(with = "bigint_ser")]
        pub total_quality_adj_power: StoragePower,
        #[serde(with = "bigint_ser")]
        pub total_qa_bytes_committed: StoragePower,
        pub total_pledge_collateral: TokenAmount,
        #[serde(with = "bigint_ser")]
        pub this_epoch_raw_byte_power: StoragePower,
        #[serde(with = "bigint_ser")]
        pub this_epoch_quality_adj_power: StoragePower,
        pub this_epoch_pledge_collateral: TokenAmount,
        pub this_epoch_qa_power_smoothed: FilterEstimate,
        pub first_cron_epoch: ChainEpoch,
        pub miner_count: i64,
        pub miner_above_min_power_count: i64,
        pub cron_event_queue: Cid,
        pub claims: Cid,
        pub proof_validation_batch: Option<Cid>,
    }
}
