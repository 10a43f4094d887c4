// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_shared::bigint::{bigint_ser, BigInt, Integer};
use fvm_shared::clock::{ChainEpoch, EPOCH_DURATION_SECONDS};
use fvm_shared::sector::{SectorQuality, SectorSize, StoragePower};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::actors::market::DealWeight;

const SECONDS_IN_DAY: i64 = 86400;
pub const EPOCHS_IN_DAY: ChainEpoch = SECONDS_IN_DAY / EPOCH_DURATION_SECONDS;

/// Precision used for making QA power calculations.
pub const SECTOR_QUALITY_PRECISION: u64 = 20;

lazy_static! {
    /// Quality multiplier for committed capacity (no deals) in a sector.
    pub static ref QUALITY_BASE_MULTIPLIER: BigInt = BigInt::from(10);

    /// Quality multiplier for unverified deals in a sector.
    pub static ref DEAL_WEIGHT_MULTIPLIER: BigInt = BigInt::from(10);

    /// Quality multiplier for verified deals in a sector.
    pub static ref VERIFIED_DEAL_WEIGHT_MULTIPLIER: BigInt = BigInt::from(100);
}

/// Network policy knobs that shape the miners' proving schedule. One value
/// per chain, carried by `ChainConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// The number of deadlines in one proving period.
    pub wpost_period_deadlines: u64,
    /// The period over which all of a miner's active sectors are challenged,
    /// in epochs.
    pub wpost_proving_period: ChainEpoch,
    /// The duration of one deadline's challenge window, in epochs.
    pub wpost_challenge_window: ChainEpoch,
    /// Lookback from a deadline's open at which to sample the challenge.
    pub wpost_challenge_lookback: ChainEpoch,
    /// Minimum period before a deadline's challenge window opens in which
    /// fault declarations for that deadline are accepted.
    pub fault_declaration_cutoff: ChainEpoch,
    /// Number of epochs after which a chain reorganisation is not accepted.
    pub chain_finality: ChainEpoch,
    /// Minimum miner power for consensus eligibility.
    #[serde(with = "bigint_ser")]
    pub minimum_consensus_power: StoragePower,
}

impl Policy {
    pub fn mainnet() -> Self {
        Self {
            wpost_period_deadlines: 48,
            wpost_proving_period: EPOCHS_IN_DAY,
            wpost_challenge_window: 30 * 60 / EPOCH_DURATION_SECONDS,
            wpost_challenge_lookback: 20,
            fault_declaration_cutoff: 70,
            chain_finality: 900,
            // 10 TiB
            minimum_consensus_power: StoragePower::from(10u64 << 40),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::mainnet()
    }
}

/// The quality of a sector as a fixed point with [`SECTOR_QUALITY_PRECISION`]
/// fractional bits: the weighted average of deal, verified-deal and base
/// space-time over the sector's whole space-time.
pub fn quality_for_weight(
    size: SectorSize,
    duration: ChainEpoch,
    deal_weight: &DealWeight,
    verified_weight: &DealWeight,
) -> SectorQuality {
    let sector_space_time = BigInt::from(size as u64) * BigInt::from(duration);
    let total_deal_space_time = deal_weight + verified_weight;

    let weighted_base_space_time =
        (&sector_space_time - total_deal_space_time) * &*QUALITY_BASE_MULTIPLIER;
    let weighted_deal_space_time = deal_weight * &*DEAL_WEIGHT_MULTIPLIER;
    let weighted_verified_space_time = verified_weight * &*VERIFIED_DEAL_WEIGHT_MULTIPLIER;
    let weighted_sum_space_time =
        weighted_base_space_time + weighted_deal_space_time + weighted_verified_space_time;
    let scaled_up_weighted_sum_space_time: SectorQuality =
        weighted_sum_space_time << SECTOR_QUALITY_PRECISION;

    scaled_up_weighted_sum_space_time
        .div_floor(&sector_space_time)
        .div_floor(&QUALITY_BASE_MULTIPLIER)
}

/// Returns the quality-adjusted power for a sector of the given size,
/// duration and deal weights.
pub fn qa_power_for_weight(
    size: SectorSize,
    duration: ChainEpoch,
    deal_weight: &DealWeight,
    verified_weight: &DealWeight,
) -> StoragePower {
    let quality = quality_for_weight(size, duration, deal_weight, verified_weight);
    (BigInt::from(size as u64) * quality) >> SECTOR_QUALITY_PRECISION
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    #[test]
    fn quality_is_base_multiplier_for_empty_sector() {
        // No deals: QA power equals raw power.
        let size = SectorSize::_32GiB;
        let power = qa_power_for_weight(size, 360, &DealWeight::zero(), &DealWeight::zero());
        assert_eq!(power, BigInt::from(size as u64));
    }

    #[test]
    fn verified_deals_multiply_power_tenfold() {
        let size = SectorSize::_32GiB;
        let duration = 360;
        // The sector's entire space-time is verified deal weight.
        let verified = BigInt::from(size as u64) * BigInt::from(duration);
        let power = qa_power_for_weight(size, duration, &DealWeight::zero(), &verified);
        assert_eq!(power, BigInt::from(size as u64) * 10);
    }
}
