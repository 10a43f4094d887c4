// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_shared::clock::ChainEpoch;
use serde::{Deserialize, Serialize};

use crate::actors::policy::Policy;

/// Deadline calculations with respect to a current epoch. "Deadline" refers
/// to the window during which proofs may be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineInfo {
    /// Epoch at which this info was calculated.
    pub current_epoch: ChainEpoch,
    /// First epoch of the proving period (<= `current_epoch`).
    pub period_start: ChainEpoch,
    /// Current deadline index, in `[0..wpost_period_deadlines)`.
    pub index: u64,
    /// First epoch from which a proof may be submitted (>= `current_epoch`).
    pub open: ChainEpoch,
    /// First epoch from which a proof may no longer be submitted (>= `open`).
    pub close: ChainEpoch,
    /// Epoch at which to sample the chain for challenge (< `open`).
    pub challenge: ChainEpoch,
    /// First epoch at which a fault declaration is rejected (< `open`).
    pub fault_cutoff: ChainEpoch,
    /// The number of deadlines in one proving period.
    pub wpost_period_deadlines: u64,
    /// The period over which all of a miner's active sectors are challenged.
    pub wpost_proving_period: ChainEpoch,
    /// The duration of a deadline's challenge window.
    pub wpost_challenge_window: ChainEpoch,
}

impl DeadlineInfo {
    pub fn new(
        policy: &Policy,
        period_start: ChainEpoch,
        deadline_idx: u64,
        current_epoch: ChainEpoch,
    ) -> Self {
        if deadline_idx < policy.wpost_period_deadlines {
            let deadline_open =
                period_start + (deadline_idx as i64 * policy.wpost_challenge_window);
            Self {
                current_epoch,
                period_start,
                index: deadline_idx,
                open: deadline_open,
                close: deadline_open + policy.wpost_challenge_window,
                challenge: deadline_open - policy.wpost_challenge_lookback,
                fault_cutoff: deadline_open - policy.fault_declaration_cutoff,
                wpost_period_deadlines: policy.wpost_period_deadlines,
                wpost_proving_period: policy.wpost_proving_period,
                wpost_challenge_window: policy.wpost_challenge_window,
            }
        } else {
            let after_last_deadline = period_start + policy.wpost_proving_period;
            Self {
                current_epoch,
                period_start,
                index: deadline_idx,
                open: after_last_deadline,
                close: after_last_deadline,
                challenge: after_last_deadline,
                fault_cutoff: 0,
                wpost_period_deadlines: policy.wpost_period_deadlines,
                wpost_proving_period: policy.wpost_proving_period,
                wpost_challenge_window: policy.wpost_challenge_window,
            }
        }
    }

    /// Whether the proving period has begun.
    pub fn period_started(&self) -> bool {
        self.current_epoch >= self.period_start
    }

    /// The first epoch in the next proving period.
    pub fn next_period_start(&self) -> ChainEpoch {
        self.period_start + self.wpost_proving_period
    }

    /// Whether the current deadline is currently open.
    pub fn is_open(&self) -> bool {
        self.current_epoch >= self.open && self.current_epoch < self.close
    }

    /// Whether the current deadline has already closed.
    pub fn has_elapsed(&self) -> bool {
        self.current_epoch >= self.close
    }

    /// The last epoch during which a proof may be submitted.
    pub fn last(&self) -> ChainEpoch {
        self.close - 1
    }

    /// Whether the deadline's fault cutoff has passed.
    pub fn fault_cutoff_passed(&self) -> bool {
        self.current_epoch >= self.fault_cutoff
    }

    /// Returns the next instance of this deadline that has not yet elapsed.
    pub fn next_not_elapsed(self) -> Self {
        if !self.has_elapsed() {
            return self;
        }

        // Roll the proving period forward until the deadline is open or in
        // the future.
        let gap = self.current_epoch - self.close;
        let delta_periods = 1 + gap / self.wpost_proving_period;

        Self {
            period_start: self.period_start + delta_periods * self.wpost_proving_period,
            open: self.open + delta_periods * self.wpost_proving_period,
            close: self.close + delta_periods * self.wpost_proving_period,
            challenge: self.challenge + delta_periods * self.wpost_proving_period,
            fault_cutoff: self.fault_cutoff + delta_periods * self.wpost_proving_period,
            ..self
        }
    }
}

/// Returns deadline-related calculations for a deadline in some proving
/// period, relative to the current epoch.
pub fn new_deadline_info(
    policy: &Policy,
    proving_period_start: ChainEpoch,
    deadline_idx: u64,
    current_epoch: ChainEpoch,
) -> DeadlineInfo {
    DeadlineInfo::new(policy, proving_period_start, deadline_idx, current_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_not_elapsed_is_identity_for_open_deadline() {
        let policy = Policy::mainnet();
        let di = new_deadline_info(&policy, 0, 0, 10);
        assert!(di.is_open() || !di.has_elapsed());
        assert_eq!(di.next_not_elapsed(), di);
    }

    #[test]
    fn next_not_elapsed_rolls_forward_whole_periods() {
        let policy = Policy::mainnet();
        // Proving period started long ago; deadline 0 elapsed many times over.
        let current = policy.wpost_proving_period * 5 + 17;
        let di = new_deadline_info(&policy, 0, 0, current);
        assert!(di.has_elapsed());

        let next = di.next_not_elapsed();
        assert!(!next.has_elapsed());
        assert_eq!(next.index, di.index);
        assert_eq!(
            (next.period_start - di.period_start) % policy.wpost_proving_period,
            0
        );
        assert!(next.close > current);
    }
}
