// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::cmp;

use fvm_shared::bigint::{BigInt, Integer};
use fvm_shared::clock::ChainEpoch;
use fvm_shared::econ::TokenAmount;
use fvm_shared::math::PRECISION;
use fvm_shared::sector::StoragePower;
use fvm_shared::smooth::{self, FilterEstimate};
use lazy_static::lazy_static;
use num_traits::Zero;

use crate::actors::policy::EPOCHS_IN_DAY;

/// Projection period of expected sector block reward for deposit required to
/// pre-commit a sector. This deposit is lost if the pre-commitment is not
/// timely followed up by a commitment proof.
const PRE_COMMIT_DEPOSIT_FACTOR: u64 = 20;

/// Projection period of expected sector block rewards for storage pledge
/// required to commit a sector. This pledge is lost if a sector is terminated
/// before its full committed lifetime.
pub const INITIAL_PLEDGE_FACTOR: u64 = 20;

pub const PRE_COMMIT_DEPOSIT_PROJECTION_PERIOD: i64 =
    (PRE_COMMIT_DEPOSIT_FACTOR as ChainEpoch) * EPOCHS_IN_DAY;
pub const INITIAL_PLEDGE_PROJECTION_PERIOD: i64 =
    (INITIAL_PLEDGE_FACTOR as ChainEpoch) * EPOCHS_IN_DAY;

const LOCK_TARGET_FACTOR_NUM: u32 = 3;
const LOCK_TARGET_FACTOR_DENOM: u32 = 10;

lazy_static! {
    /// Cap on initial pledge requirement for sectors.
    /// The target is 1 FIL (10**18 attoFIL) per 32GiB.
    /// This does not divide evenly, so the result is fractionally smaller.
    static ref INITIAL_PLEDGE_MAX_PER_BYTE: TokenAmount =
        TokenAmount::from_whole(1).div_floor(32i64 << 30);
}

/// The projected block reward a sector would earn over some period.
/// Also known as "BR(t)".
/// `BR(t) = ProjectedRewardFraction(t) * SectorQualityAdjustedPower`
/// `ProjectedRewardFraction(t)` is the sum of estimated reward over estimated
/// total power over all epochs in the projection period `[t, t+duration]`.
pub fn expected_reward_for_power(
    reward_estimate: &FilterEstimate,
    network_qa_power_estimate: &FilterEstimate,
    qa_sector_power: &StoragePower,
    projection_duration: ChainEpoch,
) -> TokenAmount {
    let network_qa_power_smoothed = network_qa_power_estimate.estimate();

    if network_qa_power_smoothed.is_zero() {
        return TokenAmount::from_atto(reward_estimate.estimate());
    }

    let expected_reward_for_proving_period = smooth::extrapolated_cum_sum_of_ratio(
        projection_duration,
        0,
        reward_estimate,
        network_qa_power_estimate,
    );
    let br128 = qa_sector_power * expected_reward_for_proving_period; // Q.0 * Q.128 => Q.128
    TokenAmount::from_atto(cmp::max(br128 >> PRECISION, Default::default()))
}

/// BR but zero values are clamped at 1 attofil. Some uses of BR (PCD, IP)
/// require a strictly positive value so accounting variables can be used as
/// succinct indicators of miner activity.
fn expected_reward_for_power_clamped_at_atto_fil(
    reward_estimate: &FilterEstimate,
    network_qa_power_estimate: &FilterEstimate,
    qa_sector_power: &StoragePower,
    projection_duration: ChainEpoch,
) -> TokenAmount {
    let br = expected_reward_for_power(
        reward_estimate,
        network_qa_power_estimate,
        qa_sector_power,
        projection_duration,
    );
    if br.le(&TokenAmount::zero()) {
        TokenAmount::from_atto(1)
    } else {
        br
    }
}

/// Computes the pre-commit deposit given sector qa weight and current network
/// conditions.
/// `PreCommit Deposit = BR(PreCommitDepositProjectionPeriod)`
pub fn pre_commit_deposit_for_power(
    reward_estimate: &FilterEstimate,
    network_qa_power_estimate: &FilterEstimate,
    qa_sector_power: &StoragePower,
) -> TokenAmount {
    expected_reward_for_power_clamped_at_atto_fil(
        reward_estimate,
        network_qa_power_estimate,
        qa_sector_power,
        PRE_COMMIT_DEPOSIT_PROJECTION_PERIOD,
    )
}

/// Computes the pledge requirement for committing new quality-adjusted power
/// to the network, given the current network total and baseline power,
/// per-epoch reward, and circulating token supply. The pledge comprises two
/// parts:
/// - storage pledge, aka IP base: a multiple of the reward expected to be
///   earned by newly-committed power
/// - consensus pledge, aka additional IP: a pro-rata fraction of the
///   circulating money supply
///
/// `IP = IPBase(t) + AdditionalIP(t)`
/// `IPBase(t) = BR(t, InitialPledgeProjectionPeriod)`
/// `AdditionalIP(t) = LockTarget(t)*PledgeShare(t)`
/// `LockTarget = (LockTargetFactorNum / LockTargetFactorDenom) * FILCirculatingSupply(t)`
/// `PledgeShare(t) = sectorQAPower / max(BaselinePower(t), NetworkQAPower(t))`
pub fn initial_pledge_for_power(
    qa_power: &StoragePower,
    baseline_power: &StoragePower,
    reward_estimate: &FilterEstimate,
    network_qa_power_estimate: &FilterEstimate,
    circulating_supply: &TokenAmount,
) -> TokenAmount {
    let ip_base = expected_reward_for_power_clamped_at_atto_fil(
        reward_estimate,
        network_qa_power_estimate,
        qa_power,
        INITIAL_PLEDGE_PROJECTION_PERIOD,
    );

    let lock_target_num = circulating_supply.atto() * LOCK_TARGET_FACTOR_NUM;
    let lock_target_denom = LOCK_TARGET_FACTOR_DENOM;
    let pledge_share_num = qa_power;
    let network_qa_power = network_qa_power_estimate.estimate();
    let pledge_share_denom =
        cmp::max(cmp::max(&network_qa_power, baseline_power), qa_power) * lock_target_denom;
    let additional_ip_num = lock_target_num * pledge_share_num;
    let additional_ip = additional_ip_num.div_floor(&pledge_share_denom);

    let nominal_pledge = ip_base + TokenAmount::from_atto(additional_ip);
    let pledge_cap = TokenAmount::from_atto(INITIAL_PLEDGE_MAX_PER_BYTE.atto() * qa_power);

    cmp::min(nominal_pledge, pledge_cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(position: u64, velocity: u64) -> FilterEstimate {
        FilterEstimate::new(BigInt::from(position), BigInt::from(velocity))
    }

    #[test]
    fn br_is_reward_share_of_sector_power() {
        // Constant estimates: one-epoch reward 100, network power 200, sector
        // power 100 => sector earns half the reward each epoch.
        let reward = estimate(100, 0);
        let power = estimate(200, 0);
        let sector_power = StoragePower::from(100u64);

        let br = expected_reward_for_power(&reward, &power, &sector_power, 1000);
        assert_eq!(br, TokenAmount::from_atto(50 * 1000));
    }

    #[test]
    fn br_clamps_at_one_atto() {
        let reward = estimate(0, 0);
        let power = estimate(1 << 40, 0);
        let sector_power = StoragePower::from(0u64);
        let deposit = pre_commit_deposit_for_power(&reward, &power, &sector_power);
        assert_eq!(deposit, TokenAmount::from_atto(1));
    }

    #[test]
    fn initial_pledge_includes_consensus_portion() {
        let reward = estimate(100, 0);
        let power = estimate(200, 0);
        let sector_power = StoragePower::from(100u64);
        let baseline = StoragePower::from(200u64);
        let supply = TokenAmount::from_atto(1_000_000);

        let pledge = initial_pledge_for_power(&sector_power, &baseline, &reward, &power, &supply);
        let base = expected_reward_for_power(
            &reward,
            &power,
            &sector_power,
            INITIAL_PLEDGE_PROJECTION_PERIOD,
        );
        // Additional IP = 0.3 * supply * (100/200) = 150_000.
        assert_eq!(pledge, base + TokenAmount::from_atto(150_000));
    }

    #[test]
    fn initial_pledge_is_capped_per_byte() {
        let reward = estimate(1_000_000_000, 0);
        let power = estimate(1, 0);
        let sector_power = StoragePower::from(1u64 << 30);
        let baseline = StoragePower::from(1u64);
        // An absurd circulating supply forces the nominal pledge over the cap.
        let supply = TokenAmount::from_whole(2_000_000_000i64);

        let pledge =
            initial_pledge_for_power(&sector_power, &baseline, &reward, &power, &supply);
        assert_eq!(
            pledge,
            TokenAmount::from_atto(INITIAL_PLEDGE_MAX_PER_BYTE.atto() * BigInt::from(1u64 << 30))
        );
    }
}
