// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_bitfield::BitField;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::{serde_bytes, BytesDe};
use fvm_shared::address::Address;
use fvm_shared::bigint::bigint_ser;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::deal::DealID;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::{
    RegisteredPoStProof, RegisteredSealProof, SectorNumber, SectorSize, StoragePower,
};

use crate::actors::market::DealWeight;

#[derive(Debug, Serialize_tuple, Deserialize_tuple)]
pub struct State {
    /// Static information about this miner.
    pub info: Cid,
    /// Total funds locked as pre-commit deposits.
    pub pre_commit_deposits: TokenAmount,
    /// Total rewards and added funds locked in vesting table.
    pub locked_funds: TokenAmount,
    /// Vesting funds, by vesting epoch.
    pub vesting_funds: Cid,
    /// Absolute value of debt this miner owes from unpaid fees.
    pub fee_debt: TokenAmount,
    /// Sum of initial pledge requirements of all active sectors.
    pub initial_pledge: TokenAmount,
    /// Sectors that have been pre-committed but not yet proven.
    /// Map, HAMT`[SectorNumber]SectorPreCommitOnChainInfo`
    pub pre_committed_sectors: Cid,
    /// Maps epochs to the pre-committed sectors to clean up at that epoch.
    pub pre_committed_sectors_cleanup: Cid,
    /// Allocated sector IDs. Sector IDs can never be reused once allocated.
    pub allocated_sectors: Cid,
    /// Information for all proven and not-yet-garbage-collected sectors.
    /// Array, AMT`[SectorNumber]SectorOnChainInfo`
    pub sectors: Cid,
    /// The first epoch in this miner's current proving period, always greater
    /// than zero. May be in the future for genesis miners.
    pub proving_period_start: ChainEpoch,
    /// Index of the deadline within the proving period beginning at
    /// `proving_period_start` that has not yet been finalized.
    pub current_deadline: u64,
    /// The sector numbers due for PoSt at each deadline in the current
    /// proving period, frozen at period start.
    pub deadlines: Cid,
    /// Deadlines with outstanding fees for early sector termination.
    pub early_terminations: BitField,
    /// True when at least one deadline has outstanding cron work.
    pub deadline_cron_active: bool,
}

#[derive(Debug, Clone, Serialize_tuple, Deserialize_tuple)]
pub struct MinerInfo {
    pub owner: Address,
    pub worker: Address,
    pub control_addresses: Vec<Address>,
    pub pending_worker_key: Option<WorkerKeyChange>,
    #[serde(with = "serde_bytes")]
    pub peer_id: Vec<u8>,
    pub multi_address: Vec<BytesDe>,
    pub window_post_proof_type: RegisteredPoStProof,
    pub sector_size: SectorSize,
    pub window_post_partition_sectors: u64,
    pub consensus_fault_elapsed: ChainEpoch,
    pub pending_owner_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct WorkerKeyChange {
    /// Must be an ID address.
    pub new_worker: Address,
    pub effective_at: ChainEpoch,
}

/// A set of deadline cids, one per deadline of the proving period.
#[derive(Debug, Serialize_tuple, Deserialize_tuple)]
pub struct Deadlines {
    pub due: Vec<Cid>,
}

/// Deadline holds the state for all sectors due at a specific deadline.
#[derive(Debug, Clone, Serialize_tuple, Deserialize_tuple)]
pub struct Deadline {
    /// Partitions in this deadline, in order.
    /// Array, AMT`[PartitionNumber]Partition`
    pub partitions: Cid,
    /// Maps epochs to partitions that may have sectors that expire in or
    /// before that epoch.
    pub expirations_epochs: Cid,
    /// Partitions that have been proved by window PoSts so far during the
    /// current challenge window.
    pub partitions_posted: BitField,
    /// Partitions with sectors that terminated early.
    pub early_terminations: BitField,
    /// The number of non-terminated sectors in this deadline (incl faulty).
    pub live_sectors: u64,
    /// The total number of sectors in this deadline (incl dead).
    pub total_sectors: u64,
    /// Memoized sum of faulty power in partitions.
    pub faulty_power: PowerPair,
    /// AMT of optimistically accepted WindowPoSt proofs, submitted during
    /// the current challenge window.
    pub optimistic_post_submissions: Cid,
    /// Snapshot of the sectors AMT at the end of the previous challenge
    /// window for this deadline.
    pub sectors_snapshot: Cid,
    /// Snapshot of the partitions AMT for the same window.
    pub partitions_snapshot: Cid,
    /// Snapshot of the proofs submitted in the previous window.
    pub optimistic_post_submissions_snapshot: Cid,
}

#[derive(Debug, Clone, Serialize_tuple, Deserialize_tuple)]
pub struct Partition {
    /// Sector numbers in this partition, including faulty, unproven and
    /// terminated sectors.
    pub sectors: BitField,
    /// Unproven sectors in this partition. This bitfield will be cleared on
    /// a successful window post (or at the next deadline).
    pub unproven: BitField,
    /// Subset of sectors detected/declared faulty and not yet recovered.
    /// Faults ∩ Terminated = ∅
    pub faults: BitField,
    /// Subset of faulty sectors expected to recover on next PoSt.
    /// Recoveries ∩ Terminated = ∅
    pub recoveries: BitField,
    /// Subset of sectors terminated but not yet removed from partition.
    pub terminated: BitField,
    /// Maps epochs to sectors that expire in or before that epoch.
    pub expirations_epochs: Cid,
    /// Subset of terminated that were before their committed expiration
    /// epoch, by termination epoch.
    pub early_terminated: Cid,
    /// Power of not-yet-terminated sectors (incl faulty & unproven).
    pub live_power: PowerPair,
    /// Power of yet-to-be-proved sectors (never faulty).
    pub unproven_power: PowerPair,
    /// Power of currently-faulty sectors. FaultyPower <= LivePower.
    pub faulty_power: PowerPair,
    /// Power of expected-to-recover sectors. RecoveringPower <= FaultyPower.
    pub recovering_power: PowerPair,
}

/// Value type for quantities of (raw, weighted) power.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct PowerPair {
    #[serde(with = "bigint_ser")]
    pub raw: StoragePower,
    #[serde(with = "bigint_ser")]
    pub qa: StoragePower,
}

/// Information stored on-chain for a proven sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SectorOnChainInfo {
    pub sector_number: SectorNumber,
    /// The seal proof type implies the PoSt proofs.
    pub seal_proof: RegisteredSealProof,
    /// `CommR`.
    pub sealed_cid: Cid,
    pub deal_ids: Vec<DealID>,
    /// Epoch during which the sector proof was accepted.
    pub activation: ChainEpoch,
    /// Epoch during which the sector expires.
    pub expiration: ChainEpoch,
    /// Integral of active deals over sector lifetime.
    #[serde(with = "bigint_ser")]
    pub deal_weight: DealWeight,
    /// Integral of active verified deals over sector lifetime.
    #[serde(with = "bigint_ser")]
    pub verified_deal_weight: DealWeight,
    /// Pledge collected to commit this sector.
    pub initial_pledge: TokenAmount,
    /// Expected one day projection of reward for sector, computed at
    /// activation time.
    pub expected_day_reward: TokenAmount,
    /// Expected twenty day projection of reward for sector, computed at
    /// activation time.
    pub expected_storage_pledge: TokenAmount,
    /// Age of sector this sector replaced, or zero.
    pub replaced_sector_age: ChainEpoch,
    /// Day reward of the sector this sector replaced, or zero.
    pub replaced_day_reward: TokenAmount,
    /// The original `SealedSectorCID`, only set on the first replica update.
    pub sector_key_cid: Option<Cid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SectorPreCommitInfo {
    pub seal_proof: RegisteredSealProof,
    pub sector_number: SectorNumber,
    /// `CommR`.
    pub sealed_cid: Cid,
    pub seal_rand_epoch: ChainEpoch,
    pub deal_ids: Vec<DealID>,
    pub expiration: ChainEpoch,
    /// Whether to replace a "committed capacity" no-deal sector.
    pub replace_capacity: bool,
    /// The committed capacity sector to replace, and its location.
    pub replace_sector_deadline: u64,
    pub replace_sector_partition: u64,
    pub replace_sector_number: SectorNumber,
}

/// Information stored on-chain for a pre-committed sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SectorPreCommitOnChainInfo {
    pub info: SectorPreCommitInfo,
    pub pre_commit_deposit: TokenAmount,
    pub pre_commit_epoch: ChainEpoch,
}
