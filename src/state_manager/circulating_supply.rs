// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use num_traits::Zero;
use serde::Serialize;
use tracing::debug;

use super::errors::Error;
use super::state_view::StateView;
use crate::actors::policy::EPOCHS_IN_DAY;
use crate::actors::{BURNT_FUNDS_ACTOR_ADDR, RESERVE_ACTOR_ADDR};

const EPOCHS_IN_YEAR: ChainEpoch = 365 * EPOCHS_IN_DAY;

/// The breakdown of the token supply in circulation at some state root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CirculatingSupply {
    pub fil_vested: TokenAmount,
    pub fil_mined: TokenAmount,
    pub fil_burnt: TokenAmount,
    pub fil_locked: TokenAmount,
    pub fil_reserve_disbursed: TokenAmount,
    pub fil_circulating: TokenAmount,
}

/// A genesis vesting entry: tokens locked at network launch, unlocking
/// linearly over a fixed duration.
struct VestingEntry {
    amount: TokenAmount,
    unlock_duration: ChainEpoch,
}

impl VestingEntry {
    /// Tokens still locked at the given chain age.
    fn amount_locked(&self, age: ChainEpoch) -> TokenAmount {
        if age >= self.unlock_duration {
            return TokenAmount::zero();
        }
        if age <= 0 {
            return self.amount.clone();
        }
        let remaining = self.unlock_duration - age;
        (&self.amount * remaining).div_floor(self.unlock_duration)
    }
}

/// Genesis-time token allocation facts needed to replay the circulating
/// supply accounting at any height. Built once per process from the chain
/// configuration.
pub struct GenesisInfo {
    vesting: Vec<VestingEntry>,
    fil_reserved: TokenAmount,
}

impl GenesisInfo {
    pub fn from_chain_config(_config: &crate::networks::ChainConfig) -> Self {
        // Genesis allocations vesting linearly, by unlock duration.
        let vesting = vec![
            VestingEntry {
                amount: TokenAmount::from_whole(49_929_341 + 32_787_700),
                unlock_duration: EPOCHS_IN_YEAR / 2,
            },
            VestingEntry {
                amount: TokenAmount::from_whole(22_421_712),
                unlock_duration: EPOCHS_IN_YEAR,
            },
            VestingEntry {
                amount: TokenAmount::from_whole(7_223_364),
                unlock_duration: 2 * EPOCHS_IN_YEAR,
            },
            VestingEntry {
                amount: TokenAmount::from_whole(87_637_883),
                unlock_duration: 3 * EPOCHS_IN_YEAR,
            },
            VestingEntry {
                amount: TokenAmount::from_whole(100_000_000 + 300_000_000),
                unlock_duration: 6 * EPOCHS_IN_YEAR,
            },
        ];
        Self {
            vesting,
            fil_reserved: TokenAmount::from_whole(300_000_000),
        }
    }

    /// Tokens vested out of the genesis allocations by the given height.
    fn get_fil_vested(&self, height: ChainEpoch) -> TokenAmount {
        self.vesting.iter().fold(TokenAmount::zero(), |acc, entry| {
            acc + entry.amount.clone() - entry.amount_locked(height)
        })
    }

    /// Replays the network's circulating-supply accounting against the given
    /// state view: vested + mined + reserve-disbursed − burnt − locked.
    /// Absence of the market, power or reward actor is fatal.
    pub fn get_circulating_supply_detailed<DB: Blockstore>(
        &self,
        height: ChainEpoch,
        view: &StateView<'_, DB>,
    ) -> Result<CirculatingSupply, Error> {
        let fil_vested = self.get_fil_vested(height);

        let fil_mined = view.reward_state()?.total_storage_power_reward();

        let fil_burnt = view
            .actor(&BURNT_FUNDS_ACTOR_ADDR)?
            .map(|actor| actor.balance)
            .ok_or_else(|| {
                Error::DependencyMissing("burnt funds actor in state tree".to_string())
            })?;

        let market_locked = view.market_state()?.total_locked();
        let power_locked = view.power_state()?.total_locked();
        let fil_locked = market_locked + power_locked;

        // Networks without a reserve actor simply have nothing disbursed.
        let fil_reserve_disbursed = match view.actor(&RESERVE_ACTOR_ADDR)? {
            Some(reserve) => self.fil_reserved.clone() - reserve.balance,
            None => {
                debug!("no reserve actor in state tree, assuming zero disbursed");
                TokenAmount::zero()
            }
        };

        let fil_circulating = fil_vested.clone() + fil_mined.clone()
            + fil_reserve_disbursed.clone()
            - fil_burnt.clone()
            - fil_locked.clone();

        Ok(CirculatingSupply {
            fil_vested,
            fil_mined,
            fil_burnt,
            fil_locked,
            fil_reserve_disbursed,
            fil_circulating,
        })
    }
}
