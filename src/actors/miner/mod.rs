// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod v8;
pub mod v9;

use std::borrow::Cow;

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_amt::Amt;
use fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::BytesDe;
use fvm_ipld_hamt::{BytesKey, Hamt};
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::deal::DealID;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::{RegisteredPoStProof, RegisteredSealProof, SectorNumber, SectorSize};
use integer_encoding::VarInt;
use serde::{Deserialize, Serialize};

use crate::actors::deadlines::DeadlineInfo;
use crate::actors::init::HAMT_BIT_WIDTH;
use crate::actors::market::DealWeight;
use crate::actors::policy::Policy;
use crate::actors::power::Claim;
use crate::actors::{load_state, require_version, ActorError, ActorKind, ActorVersion};
use crate::state_tree::ActorState;
use crate::utils::db::CborStoreExt as _;

/// HAMT key encoding for sector numbers.
fn u64_key(k: u64) -> BytesKey {
    BytesKey(k.encode_var_vec())
}

/// Storage miner actor state.
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
        match require_version(ActorKind::Miner, &actor.code)? {
            ActorVersion::V8 => load_state(store, &actor.state).map(State::V8),
            ActorVersion::V9 => load_state(store, &actor.state).map(State::V9),
        }
    }

    /// Static information about the miner.
    pub fn info<BS: Blockstore>(&self, store: &BS) -> anyhow::Result<MinerInfo> {
        match self {
            State::V8(st) => {
                let info: v8::MinerInfo = store.get_cbor_required(&st.info)?;
                Ok(MinerInfo {
                    owner: info.owner,
                    worker: info.worker,
                    new_worker: info.pending_worker_key.as_ref().map(|k| k.new_worker),
                    worker_change_epoch: info
                        .pending_worker_key
                        .map(|k| k.effective_at)
                        .unwrap_or(-1),
                    control_addresses: info.control_addresses,
                    peer_id: info.peer_id,
                    multiaddrs: info.multi_address,
                    window_post_proof_type: info.window_post_proof_type,
                    sector_size: info.sector_size,
                    window_post_partition_sectors: info.window_post_partition_sectors,
                    consensus_fault_elapsed: info.consensus_fault_elapsed,
                })
            }
            State::V9(st) => {
                let info: v9::MinerInfo = store.get_cbor_required(&st.info)?;
                Ok(MinerInfo {
                    owner: info.owner,
                    worker: info.worker,
                    new_worker: info.pending_worker_key.as_ref().map(|k| k.new_worker),
                    worker_change_epoch: info
                        .pending_worker_key
                        .map(|k| k.effective_at)
                        .unwrap_or(-1),
                    control_addresses: info.control_addresses,
                    peer_id: info.peer_id,
                    multiaddrs: info.multi_address,
                    window_post_proof_type: info.window_post_proof_type,
                    sector_size: info.sector_size,
                    window_post_partition_sectors: info.window_post_partition_sectors,
                    consensus_fault_elapsed: info.consensus_fault_elapsed,
                })
            }
        }
    }

    /// Gets the fee debt of the miner.
    pub fn fee_debt(&self) -> TokenAmount {
        match self {
            State::V8(st) => st.fee_debt.clone(),
            State::V9(st) => st.fee_debt.clone(),
        }
    }

    /// Deadline calculations for the miner's recorded proving period at the
    /// given epoch. Callers wanting the next deadline that has not yet
    /// elapsed chain this with [`DeadlineInfo::next_not_elapsed`].
    pub fn deadline_info(&self, policy: &Policy, current_epoch: ChainEpoch) -> DeadlineInfo {
        let (period_start, deadline_idx) = match self {
            State::V8(st) => (st.proving_period_start, st.current_deadline),
            State::V9(st) => (st.proving_period_start, st.current_deadline),
        };
        DeadlineInfo::new(policy, period_start, deadline_idx, current_epoch)
    }

    fn deadlines_due<BS: Blockstore>(&self, store: &BS) -> anyhow::Result<Vec<Cid>> {
        let root = match self {
            State::V8(st) => &st.deadlines,
            State::V9(st) => &st.deadlines,
        };
        let due = match self {
            State::V8(_) => store.get_cbor_required::<v8::Deadlines>(root)?.due,
            State::V9(_) => store.get_cbor_required::<v9::Deadlines>(root)?.due,
        };
        Ok(due)
    }

    pub fn num_deadlines<BS: Blockstore>(&self, store: &BS) -> anyhow::Result<u64> {
        Ok(self.deadlines_due(store)?.len() as u64)
    }

    /// Visits the miner's deadlines in ascending index order.
    pub fn for_each_deadline<BS: Blockstore>(
        &self,
        store: &BS,
        mut f: impl FnMut(u64, Deadline) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        for (idx, cid) in self.deadlines_due(store)?.iter().enumerate() {
            let deadline = self.load_deadline_cid(store, cid)?;
            f(idx as u64, deadline)?;
        }
        Ok(())
    }

    /// Loads the deadline at the given index.
    pub fn load_deadline<BS: Blockstore>(
        &self,
        store: &BS,
        idx: u64,
    ) -> anyhow::Result<Option<Deadline>> {
        match self.deadlines_due(store)?.get(idx as usize) {
            Some(cid) => Ok(Some(self.load_deadline_cid(store, cid)?)),
            None => Ok(None),
        }
    }

    fn load_deadline_cid<BS: Blockstore>(
        &self,
        store: &BS,
        cid: &Cid,
    ) -> anyhow::Result<Deadline> {
        Ok(match self {
            State::V8(_) => Deadline::V8(store.get_cbor_required(cid)?),
            State::V9(_) => Deadline::V9(store.get_cbor_required(cid)?),
        })
    }

    /// Loads sectors corresponding to the bitfield. If no bitfield is passed
    /// in, return all.
    pub fn load_sectors<BS: Blockstore>(
        &self,
        store: &BS,
        sectors: Option<&BitField>,
    ) -> anyhow::Result<Vec<SectorOnChainInfo>> {
        let root = match self {
            State::V8(st) => &st.sectors,
            State::V9(st) => &st.sectors,
        };
        let mut infos = Vec::new();
        match self {
            State::V8(_) => {
                let amt: Amt<v8::SectorOnChainInfo, _> = Amt::load(root, store)?;
                match sectors {
                    Some(sectors) => {
                        for number in sectors.iter() {
                            let info = amt
                                .get(number)?
                                .with_context(|| format!("sector {number} not found"))?;
                            infos.push(info.clone().into());
                        }
                    }
                    None => amt.for_each(|_, info| {
                        infos.push(info.clone().into());
                        Ok(())
                    })?,
                }
            }
            State::V9(_) => {
                let amt: Amt<v9::SectorOnChainInfo, _> = Amt::load(root, store)?;
                match sectors {
                    Some(sectors) => {
                        for number in sectors.iter() {
                            let info = amt
                                .get(number)?
                                .with_context(|| format!("sector {number} not found"))?;
                            infos.push(info.clone().into());
                        }
                    }
                    None => amt.for_each(|_, info| {
                        infos.push(info.clone().into());
                        Ok(())
                    })?,
                }
            }
        }
        Ok(infos)
    }

    /// Loads a specific sector number, if present.
    pub fn get_sector<BS: Blockstore>(
        &self,
        store: &BS,
        sector_number: SectorNumber,
    ) -> anyhow::Result<Option<SectorOnChainInfo>> {
        match self {
            State::V8(st) => {
                let amt: Amt<v8::SectorOnChainInfo, _> = Amt::load(&st.sectors, store)?;
                Ok(amt.get(sector_number)?.cloned().map(Into::into))
            }
            State::V9(st) => {
                let amt: Amt<v9::SectorOnChainInfo, _> = Amt::load(&st.sectors, store)?;
                Ok(amt.get(sector_number)?.cloned().map(Into::into))
            }
        }
    }

    /// Gets pre-committed on-chain info for a sector number, if present.
    pub fn get_precommitted_sector<BS: Blockstore>(
        &self,
        store: &BS,
        sector_number: SectorNumber,
    ) -> anyhow::Result<Option<SectorPreCommitOnChainInfo>> {
        match self {
            State::V8(st) => {
                let precommitted: Hamt<_, v8::SectorPreCommitOnChainInfo> =
                    Hamt::load_with_bit_width(&st.pre_committed_sectors, store, HAMT_BIT_WIDTH)
                        .context("failed to load precommitted sectors")?;
                Ok(precommitted
                    .get(&u64_key(sector_number))?
                    .cloned()
                    .map(Into::into))
            }
            State::V9(st) => {
                let precommitted: Hamt<_, v9::SectorPreCommitOnChainInfo> =
                    Hamt::load_with_bit_width(&st.pre_committed_sectors, store, HAMT_BIT_WIDTH)
                        .context("failed to load precommitted sectors")?;
                Ok(precommitted
                    .get(&u64_key(sector_number))?
                    .cloned()
                    .map(Into::into))
            }
        }
    }

    /// Whether the sector number has ever been allocated. Allocated numbers
    /// are never reused, even after sector termination.
    pub fn is_allocated<BS: Blockstore>(
        &self,
        store: &BS,
        sector_number: SectorNumber,
    ) -> anyhow::Result<bool> {
        let root = match self {
            State::V8(st) => &st.allocated_sectors,
            State::V9(st) => &st.allocated_sectors,
        };
        let allocated: BitField = store.get_cbor_required(root)?;
        Ok(allocated.get(sector_number))
    }

    /// Returns the deadline and partition index holding a sector number, or
    /// `None` if the sector is not due at any deadline.
    pub fn find_sector<BS: Blockstore>(
        &self,
        store: &BS,
        sector_number: SectorNumber,
    ) -> anyhow::Result<Option<SectorLocation>> {
        let mut location = None;
        self.for_each_deadline(store, |deadline_idx, deadline| {
            if location.is_some() {
                return Ok(());
            }
            deadline.for_each_partition(store, |partition_idx, partition| {
                if location.is_none() && partition.all_sectors().get(sector_number) {
                    location = Some(SectorLocation {
                        deadline: deadline_idx,
                        partition: partition_idx,
                    });
                }
                Ok(())
            })
        })?;
        Ok(location)
    }

    /// Unions one of the five per-partition sector sets across every
    /// partition of every deadline, in ascending deadline-then-partition
    /// order. Partitions within a deadline are disjoint by schema invariant;
    /// the union is computed with set semantics regardless, so a sector
    /// number appearing twice is never double-counted.
    pub fn all_part_sectors<BS: Blockstore>(
        &self,
        store: &BS,
        selector: impl Fn(&Partition<'_>) -> BitField,
    ) -> anyhow::Result<BitField> {
        let mut parts = Vec::new();
        self.for_each_deadline(store, |_, deadline| {
            deadline.for_each_partition(store, |_, partition| {
                parts.push(selector(&partition));
                Ok(())
            })
        })?;
        Ok(BitField::union(parts.iter()))
    }
}

/// Static information about the miner, uniform across schema versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinerInfo {
    pub owner: Address,
    pub worker: Address,
    pub new_worker: Option<Address>,
    /// Must all be ID addresses.
    pub control_addresses: Vec<Address>,
    pub worker_change_epoch: ChainEpoch,
    pub peer_id: Vec<u8>,
    pub multiaddrs: Vec<BytesDe>,
    pub window_post_proof_type: RegisteredPoStProof,
    pub sector_size: SectorSize,
    pub window_post_partition_sectors: u64,
    pub consensus_fault_elapsed: ChainEpoch,
}

impl MinerInfo {
    pub fn worker(&self) -> Address {
        self.worker
    }

    pub fn sector_size(&self) -> SectorSize {
        self.sector_size
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerPower {
    pub miner_power: Claim,
    pub total_power: Claim,
    pub has_min_power: bool,
}

/// Deadline holds the state for all sectors due at a specific deadline.
pub enum Deadline {
    V8(v8::Deadline),
    V9(v9::Deadline),
}

impl Deadline {
    /// Visits the deadline's partitions in ascending index order.
    pub fn for_each_partition<BS: Blockstore>(
        &self,
        store: &BS,
        mut f: impl FnMut(u64, Partition<'_>) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        match self {
            Deadline::V8(dl) => {
                let partitions: Amt<v8::Partition, _> = Amt::load(&dl.partitions, store)?;
                partitions.for_each(|idx, part| f(idx, Partition::V8(Cow::Borrowed(part))))?;
            }
            Deadline::V9(dl) => {
                let partitions: Amt<v9::Partition, _> = Amt::load(&dl.partitions, store)?;
                partitions.for_each(|idx, part| f(idx, Partition::V9(Cow::Borrowed(part))))?;
            }
        }
        Ok(())
    }

    /// Partitions that have had a window PoSt accepted in the current
    /// challenge window.
    pub fn post_submissions(&self) -> BitField {
        match self {
            Deadline::V8(dl) => dl.partitions_posted.clone(),
            Deadline::V9(dl) => dl.partitions_posted.clone(),
        }
    }

    pub fn live_sectors(&self) -> u64 {
        match self {
            Deadline::V8(dl) => dl.live_sectors,
            Deadline::V9(dl) => dl.live_sectors,
        }
    }

    pub fn total_sectors(&self) -> u64 {
        match self {
            Deadline::V8(dl) => dl.total_sectors,
            Deadline::V9(dl) => dl.total_sectors,
        }
    }
}

#[allow(clippy::large_enum_variant)]
pub enum Partition<'a> {
    V8(Cow<'a, v8::Partition>),
    V9(Cow<'a, v9::Partition>),
}

impl Partition<'_> {
    /// All sector numbers in this partition, including faulty, unproven and
    /// terminated sectors.
    pub fn all_sectors(&self) -> &BitField {
        match self {
            Partition::V8(p) => &p.sectors,
            Partition::V9(p) => &p.sectors,
        }
    }

    /// Declared or detected faults, not yet recovered.
    pub fn faulty_sectors(&self) -> &BitField {
        match self {
            Partition::V8(p) => &p.faults,
            Partition::V9(p) => &p.faults,
        }
    }

    /// Faulty sectors expected to recover on the next PoSt.
    pub fn recovering_sectors(&self) -> &BitField {
        match self {
            Partition::V8(p) => &p.recoveries,
            Partition::V9(p) => &p.recoveries,
        }
    }

    /// Live sectors are those that are not terminated (but may be faulty).
    pub fn live_sectors(&self) -> BitField {
        match self {
            Partition::V8(p) => &p.sectors - &p.terminated,
            Partition::V9(p) => &p.sectors - &p.terminated,
        }
    }

    /// Active sectors are those actively contributing power: neither
    /// terminated, faulty, nor yet to be proven.
    pub fn active_sectors(&self) -> BitField {
        match self {
            Partition::V8(p) => &(&self.live_sectors() - &p.faults) - &p.unproven,
            Partition::V9(p) => &(&self.live_sectors() - &p.faults) - &p.unproven,
        }
    }
}

/// The deadline and partition indices locating a sector in the proving
/// schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorLocation {
    pub deadline: u64,
    pub partition: u64,
}

/// Information stored on-chain for a proven sector, uniform across schema
/// versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
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
    pub deal_weight: DealWeight,
    /// Integral of active verified deals over sector lifetime.
    pub verified_deal_weight: DealWeight,
    /// Pledge collected to commit this sector.
    pub initial_pledge: TokenAmount,
    pub expected_day_reward: TokenAmount,
    pub expected_storage_pledge: TokenAmount,
    pub simple_qa_power: bool,
}

impl From<v8::SectorOnChainInfo> for SectorOnChainInfo {
    fn from(info: v8::SectorOnChainInfo) -> Self {
        Self {
            sector_number: info.sector_number,
            seal_proof: info.seal_proof,
            sealed_cid: info.sealed_cid,
            deal_ids: info.deal_ids,
            activation: info.activation,
            expiration: info.expiration,
            deal_weight: info.deal_weight,
            verified_deal_weight: info.verified_deal_weight,
            initial_pledge: info.initial_pledge,
            expected_day_reward: info.expected_day_reward,
            expected_storage_pledge: info.expected_storage_pledge,
            simple_qa_power: false,
        }
    }
}

impl From<v9::SectorOnChainInfo> for SectorOnChainInfo {
    fn from(info: v9::SectorOnChainInfo) -> Self {
        Self {
            sector_number: info.sector_number,
            seal_proof: info.seal_proof,
            sealed_cid: info.sealed_cid,
            deal_ids: info.deal_ids,
            activation: info.activation,
            expiration: info.expiration,
            deal_weight: info.deal_weight,
            verified_deal_weight: info.verified_deal_weight,
            initial_pledge: info.initial_pledge,
            expected_day_reward: info.expected_day_reward,
            expected_storage_pledge: info.expected_storage_pledge,
            simple_qa_power: info.simple_qa_power,
        }
    }
}

/// The pre-commitment a miner submits to register intent to prove a sector,
/// uniform across schema versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorPreCommitInfo {
    pub seal_proof: RegisteredSealProof,
    pub sector_number: SectorNumber,
    pub sealed_cid: Cid,
    pub seal_rand_epoch: ChainEpoch,
    pub deal_ids: Vec<DealID>,
    pub expiration: ChainEpoch,
    pub unsealed_cid: Option<Cid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorPreCommitOnChainInfo {
    pub info: SectorPreCommitInfo,
    pub pre_commit_deposit: TokenAmount,
    pub pre_commit_epoch: ChainEpoch,
}

impl From<v8::SectorPreCommitOnChainInfo> for SectorPreCommitOnChainInfo {
    fn from(info: v8::SectorPreCommitOnChainInfo) -> Self {
        Self {
            info: SectorPreCommitInfo {
                seal_proof: info.info.seal_proof,
                sector_number: info.info.sector_number,
                sealed_cid: info.info.sealed_cid,
                seal_rand_epoch: info.info.seal_rand_epoch,
                deal_ids: info.info.deal_ids,
                expiration: info.info.expiration,
                unsealed_cid: None,
            },
            pre_commit_deposit: info.pre_commit_deposit,
            pre_commit_epoch: info.pre_commit_epoch,
        }
    }
}

impl From<v9::SectorPreCommitOnChainInfo> for SectorPreCommitOnChainInfo {
    fn from(info: v9::SectorPreCommitOnChainInfo) -> Self {
        Self {
            info: SectorPreCommitInfo {
                seal_proof: info.info.seal_proof,
                sector_number: info.info.sector_number,
                sealed_cid: info.info.sealed_cid,
                seal_rand_epoch: info.info.seal_rand_epoch,
                deal_ids: info.info.deal_ids,
                expiration: info.info.expiration,
                unsealed_cid: info.info.unsealed_cid,
            },
            pre_commit_deposit: info.pre_commit_deposit,
            pre_commit_epoch: info.pre_commit_epoch,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for assembling miner state fixtures in an in-memory store.

    use super::*;
    use crate::utils::db::CborStoreExt;

    pub struct PartitionSpec {
        pub sectors: Vec<u64>,
        pub unproven: Vec<u64>,
        pub faults: Vec<u64>,
        pub recoveries: Vec<u64>,
        pub terminated: Vec<u64>,
    }

    pub fn bitfield(bits: &[u64]) -> BitField {
        let mut bf = BitField::new();
        for bit in bits {
            bf.set(*bit);
        }
        bf
    }

    fn empty_amt<BS: Blockstore>(store: &BS) -> Cid {
        Amt::<u64, _>::new(store).flush().unwrap()
    }

    pub fn put_partition<BS: Blockstore>(store: &BS, spec: &PartitionSpec) -> v9::Partition {
        v9::Partition {
            sectors: bitfield(&spec.sectors),
            unproven: bitfield(&spec.unproven),
            faults: bitfield(&spec.faults),
            recoveries: bitfield(&spec.recoveries),
            terminated: bitfield(&spec.terminated),
            expirations_epochs: empty_amt(store),
            early_terminated: empty_amt(store),
            live_power: v9::PowerPair::default(),
            unproven_power: v9::PowerPair::default(),
            faulty_power: v9::PowerPair::default(),
            recovering_power: v9::PowerPair::default(),
        }
    }

    pub fn put_deadline<BS: Blockstore>(store: &BS, partitions: Vec<v9::Partition>) -> Cid {
        let mut amt = Amt::new(store);
        let live = partitions
            .iter()
            .map(|p| (&p.sectors - &p.terminated).len())
            .sum();
        let total = partitions.iter().map(|p| p.sectors.len()).sum();
        for (idx, partition) in partitions.into_iter().enumerate() {
            amt.set(idx as u64, partition).unwrap();
        }
        let partitions = amt.flush().unwrap();
        store
            .put_cbor_default(&v9::Deadline {
                partitions,
                expirations_epochs: empty_amt(store),
                partitions_posted: BitField::new(),
                early_terminations: BitField::new(),
                live_sectors: live,
                total_sectors: total,
                faulty_power: v9::PowerPair::default(),
                optimistic_post_submissions: empty_amt(store),
                sectors_snapshot: empty_amt(store),
                partitions_snapshot: empty_amt(store),
                optimistic_post_submissions_snapshot: empty_amt(store),
            })
            .unwrap()
    }

    pub fn sector_info(sector_number: u64, expiration: ChainEpoch) -> v9::SectorOnChainInfo {
        use num_traits::Zero as _;
        v9::SectorOnChainInfo {
            sector_number,
            seal_proof: RegisteredSealProof::StackedDRG32GiBV1P1,
            sealed_cid: cid::Cid::new_v1(
                fvm_ipld_encoding::DAG_CBOR,
                cid::multihash::Multihash::wrap(0x0, b"commr").unwrap(),
            ),
            deal_ids: vec![],
            activation: 0,
            expiration,
            deal_weight: DealWeight::zero(),
            verified_deal_weight: DealWeight::zero(),
            initial_pledge: TokenAmount::zero(),
            expected_day_reward: TokenAmount::zero(),
            expected_storage_pledge: TokenAmount::zero(),
            replaced_sector_age: 0,
            replaced_day_reward: TokenAmount::zero(),
            sector_key_cid: None,
            simple_qa_power: true,
        }
    }

    /// Builds a v9 miner state with the given deadlines (each a list of
    /// partition specs) and sectors, returning the state ready to be put in
    /// a state tree.
    pub fn build_state<BS: Blockstore>(
        store: &BS,
        deadlines: Vec<Vec<PartitionSpec>>,
        sectors: Vec<v9::SectorOnChainInfo>,
        info: v9::MinerInfo,
    ) -> v9::State {
        let due = deadlines
            .into_iter()
            .map(|specs| {
                let partitions = specs.iter().map(|s| put_partition(store, s)).collect();
                put_deadline(store, partitions)
            })
            .collect();
        let deadlines = store.put_cbor_default(&v9::Deadlines { due }).unwrap();

        let mut allocated = BitField::new();
        let mut sectors_amt = Amt::new(store);
        for sector in sectors {
            allocated.set(sector.sector_number);
            sectors_amt.set(sector.sector_number, sector).unwrap();
        }
        let sectors = sectors_amt.flush().unwrap();
        let allocated_sectors = store.put_cbor_default(&allocated).unwrap();
        let info = store.put_cbor_default(&info).unwrap();

        let empty_precommits = Hamt::<_, v9::SectorPreCommitOnChainInfo>::new_with_bit_width(
            store,
            HAMT_BIT_WIDTH,
        )
        .flush()
        .unwrap();

        use num_traits::Zero as _;
        v9::State {
            info,
            pre_commit_deposits: TokenAmount::zero(),
            locked_funds: TokenAmount::zero(),
            vesting_funds: empty_amt(store),
            fee_debt: TokenAmount::zero(),
            initial_pledge: TokenAmount::zero(),
            pre_committed_sectors: empty_precommits,
            pre_committed_sectors_cleanup: empty_amt(store),
            allocated_sectors,
            sectors,
            proving_period_start: 0,
            current_deadline: 0,
            deadlines,
            early_terminations: BitField::new(),
            deadline_cron_active: false,
        }
    }

    pub fn miner_info() -> v9::MinerInfo {
        v9::MinerInfo {
            owner: Address::new_id(1000),
            worker: Address::new_id(1001),
            control_addresses: vec![],
            pending_worker_key: None,
            peer_id: vec![],
            multi_address: vec![],
            window_post_proof_type: RegisteredPoStProof::StackedDRGWindow32GiBV1,
            sector_size: SectorSize::_32GiB,
            window_post_partition_sectors: 2349,
            consensus_fault_elapsed: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::actors::{code_id, ActorKind, ActorVersion};
    use crate::db::MemoryDB;
    use crate::utils::db::CborStoreExt as _;
    use fvm_shared::econ::TokenAmount;
    use num_traits::Zero as _;

    fn fixture_state(store: &MemoryDB) -> State {
        // Four sectors in one partition: sector 2 faulty and recovering,
        // sector 4 not yet proven, so the active set is {1, 3}.
        let spec = PartitionSpec {
            sectors: vec![1, 2, 3, 4],
            unproven: vec![4],
            faults: vec![2],
            recoveries: vec![2],
            terminated: vec![],
        };
        let state = build_state(
            store,
            vec![vec![spec]],
            vec![
                sector_info(1, 1000),
                sector_info(2, 1000),
                sector_info(3, 1000),
                sector_info(4, 1000),
            ],
            miner_info(),
        );
        let head = store.put_cbor_default(&state).unwrap();
        State::load(
            store,
            &ActorState {
                code: code_id(ActorKind::Miner, ActorVersion::V9),
                state: head,
                balance: TokenAmount::zero(),
                sequence: 0,
            },
        )
        .unwrap()
    }

    #[test]
    fn all_part_sectors_selectors() {
        let store = MemoryDB::default();
        let state = fixture_state(&store);

        let all = state
            .all_part_sectors(&store, |p| p.all_sectors().clone())
            .unwrap();
        let faulty = state
            .all_part_sectors(&store, |p| p.faulty_sectors().clone())
            .unwrap();
        let recovering = state
            .all_part_sectors(&store, |p| p.recovering_sectors().clone())
            .unwrap();
        let live = state.all_part_sectors(&store, |p| p.live_sectors()).unwrap();
        let active = state
            .all_part_sectors(&store, |p| p.active_sectors())
            .unwrap();

        assert_eq!(all.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(faulty.iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(recovering.iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(live.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(active.iter().collect::<Vec<_>>(), vec![1, 3]);

        // Set algebra invariants.
        assert!(faulty.iter().all(|b| live.get(b)));
        assert!(recovering.iter().all(|b| faulty.get(b)));
        assert!(active.iter().all(|b| !faulty.get(b)));
    }

    #[test]
    fn all_part_sectors_empty_deadlines() {
        let store = MemoryDB::default();
        let state = build_state(&store, vec![], vec![], miner_info());
        let head = store.put_cbor_default(&state).unwrap();
        let state = State::load(
            &store,
            &ActorState {
                code: code_id(ActorKind::Miner, ActorVersion::V9),
                state: head,
                balance: TokenAmount::zero(),
                sequence: 0,
            },
        )
        .unwrap();

        let all = state
            .all_part_sectors(&store, |p| p.all_sectors().clone())
            .unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn find_sector_locates_partitions() {
        let store = MemoryDB::default();
        let state = fixture_state(&store);

        assert_eq!(
            state.find_sector(&store, 3).unwrap(),
            Some(SectorLocation {
                deadline: 0,
                partition: 0
            })
        );
        assert_eq!(state.find_sector(&store, 9).unwrap(), None);
    }

    #[test]
    fn sectors_by_bitfield_and_number() {
        let store = MemoryDB::default();
        let state = fixture_state(&store);

        let some = state
            .load_sectors(&store, Some(&bitfield(&[1, 3])))
            .unwrap();
        assert_eq!(
            some.iter().map(|s| s.sector_number).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let all = state.load_sectors(&store, None).unwrap();
        assert_eq!(all.len(), 4);

        assert!(state.get_sector(&store, 2).unwrap().is_some());
        assert!(state.get_sector(&store, 9).unwrap().is_none());
        assert!(state.load_sectors(&store, Some(&bitfield(&[9]))).is_err());
    }

    #[test]
    fn allocated_numbers_are_sticky() {
        let store = MemoryDB::default();
        let state = fixture_state(&store);

        assert!(state.is_allocated(&store, 1).unwrap());
        assert!(!state.is_allocated(&store, 9).unwrap());
    }

    #[test]
    fn decoded_state_reencodes_to_the_same_root() {
        let store = MemoryDB::default();
        let raw = build_state(&store, vec![], vec![], miner_info());
        let head = store.put_cbor_default(&raw).unwrap();

        let loaded = State::load(
            &store,
            &ActorState {
                code: code_id(ActorKind::Miner, ActorVersion::V9),
                state: head,
                balance: TokenAmount::zero(),
                sequence: 0,
            },
        )
        .unwrap();

        // Decode, re-encode, reload: the bytes are a fixed point.
        assert_eq!(store.put_cbor_default(&loaded).unwrap(), head);
    }
}
