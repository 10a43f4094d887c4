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
    pub info: Cid,
    pub pre_commit_deposits: TokenAmount,
    pub locked_funds: TokenAmount,
    pub vesting_funds: Cid,
    pub fee_debt: TokenAmount,
    pub initial_pledge: TokenAmount,
    pub pre_committed_sectors: Cid,
    pub pre_committed_sectors_cleanup: Cid,
    pub allocated_sectors: Cid,
    pub sectors: Cid,
    pub proving_period_start: ChainEpoch,
    pub current_deadline: u64,
    pub deadlines: Cid,
    pub early_terminations: BitField,
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
    pub new_worker: Address,
    pub effective_at: ChainEpoch,
}

#[derive(Debug, Serialize_tuple, Deserialize_tuple)]
pub struct Deadlines {
    pub due: Vec<Cid>,
}

#[derive(Debug, Clone, Serialize_tuple, Deserialize_tuple)]
pub struct Deadline {
    pub partitions: Cid,
    pub expirations_epochs: Cid,
    pub partitions_posted: BitField,
    pub early_terminations: BitField,
    pub live_sectors: u64,
    pub total_sectors: u64,
    pub faulty_power: PowerPair,
    pub optimistic_post_submissions: Cid,
    pub sectors_snapshot: Cid,
    pub partitions_snapshot: Cid,
    pub optimistic_post_submissions_snapshot: Cid,
}

#[derive(Debug, Clone, Serialize_tuple, Deserialize_tuple)]
pub struct Partition {
    pub sectors: BitField,
    pub unproven: BitField,
    pub faults: BitField,
    pub recoveries: BitField,
    pub terminated: BitField,
    pub expirations_epochs: Cid,
    pub early_terminated: Cid,
    pub live_power: PowerPair,
    pub unproven_power: PowerPair,
    pub faulty_power: PowerPair,
    pub recovering_power: PowerPair,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct PowerPair {
    #[serde(with = "bigint_ser")]
    pub raw: StoragePower,
    #[serde(with = "bigint_ser")]
    pub qa: StoragePower,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SectorOnChainInfo {
    pub sector_number: SectorNumber,
    pub seal_proof: RegisteredSealProof,
    pub sealed_cid: Cid,
    pub deal_ids: Vec<DealID>,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    #[serde(with = "bigint_ser")]
    pub deal_weight: DealWeight,
    #[serde(with = "bigint_ser")]
    pub verified_deal_weight: DealWeight,
    pub initial_pledge: TokenAmount,
    pub expected_day_reward: TokenAmount,
    pub expected_storage_pledge: TokenAmount,
    pub replaced_sector_age: ChainEpoch,
    pub replaced_day_reward: TokenAmount,
    pub sector_key_cid: Option<Cid>,
    /// Flag for the QA power mechanism introduced in fip 0045.
    pub simple_qa_power: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SectorPreCommitInfo {
    pub seal_proof: RegisteredSealProof,
    pub sector_number: SectorNumber,
    pub sealed_cid: Cid,
    pub seal_rand_epoch: ChainEpoch,
    pub deal_ids: Vec<DealID>,
    pub expiration: ChainEpoch,
    /// `CommD`, absent for a sector with no deal data.
    pub unsealed_cid: Option<Cid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct SectorPreCommitOnChainInfo {
    pub info: SectorPreCommitInfo,
    pub pre_commit_deposit: TokenAmount,
    pub pre_commit_epoch: ChainEpoch,
}
