// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::{ensure, Context as _};
use cid::Cid;
use fvm_ipld_amt::Amt;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use fvm_shared::bigint::BigInt;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::deal::DealID;
use fvm_shared::econ::TokenAmount;
use fvm_shared::piece::PaddedPieceSize;
use num_traits::Zero;
use serde::Serialize;

use crate::actors::{load_state, require_version, ActorError, ActorKind, ActorVersion};
use crate::state_tree::ActorState;

/// Integral of deal piece size over deal duration.
pub type DealWeight = BigInt;

/// Storage market actor state.
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
        match require_version(ActorKind::Market, &actor.code)? {
            ActorVersion::V8 => load_state(store, &actor.state).map(State::V8),
            ActorVersion::V9 => load_state(store, &actor.state).map(State::V9),
        }
    }

    /// Deal proposals, keyed by deal id.
    pub fn proposals<'bs, BS>(&self, store: &'bs BS) -> anyhow::Result<DealProposals<'bs, BS>>
    where
        BS: Blockstore,
    {
        let root = match self {
            State::V8(st) => &st.proposals,
            State::V9(st) => &st.proposals,
        };
        Ok(DealProposals(
            Amt::load(root, store).context("failed to load deal proposal array")?,
        ))
    }

    /// Per-deal mutable state, keyed by deal id. A deal that has a proposal
    /// but no state entry has not been activated yet.
    pub fn states<'bs, BS>(&self, store: &'bs BS) -> anyhow::Result<DealStates<'bs, BS>>
    where
        BS: Blockstore,
    {
        let root = match self {
            State::V8(st) => &st.states,
            State::V9(st) => &st.states,
        };
        Ok(DealStates(
            Amt::load(root, store).context("failed to load deal state array")?,
        ))
    }

    /// Total funds the market holds locked, across collateral and storage
    /// fees.
    pub fn total_locked(&self) -> TokenAmount {
        match self {
            State::V8(st) => {
                &st.total_client_locked_collateral
                    + &st.total_provider_locked_collateral
                    + &st.total_client_storage_fee
            }
            State::V9(st) => {
                &st.total_client_locked_collateral
                    + &st.total_provider_locked_collateral
                    + &st.total_client_storage_fee
            }
        }
    }

    /// Checks that the given deals can all be activated by `miner_addr` in a
    /// sector expiring at `sector_expiry`, and returns their raw and verified
    /// deal weights.
    pub fn verify_deals_for_activation<BS>(
        &self,
        store: &BS,
        miner_addr: &Address,
        deal_ids: &[DealID],
        curr_epoch: ChainEpoch,
        sector_expiry: ChainEpoch,
    ) -> anyhow::Result<(DealWeight, DealWeight)>
    where
        BS: Blockstore,
    {
        let proposals = self.proposals(store)?;

        let mut deal_weight = DealWeight::zero();
        let mut verified_deal_weight = DealWeight::zero();

        for id in deal_ids {
            let proposal = proposals
                .get(*id)?
                .with_context(|| format!("no such deal {id}"))?;

            ensure!(
                &proposal.provider == miner_addr,
                "deal {id} has provider {}, not miner {miner_addr}",
                proposal.provider,
            );
            ensure!(
                curr_epoch <= proposal.start_epoch,
                "deal {id} already started at {}",
                proposal.start_epoch,
            );
            ensure!(
                proposal.end_epoch <= sector_expiry,
                "deal {id} would outlive the sector ({} > {sector_expiry})",
                proposal.end_epoch,
            );

            let space_time = DealWeight::from(proposal.piece_size.0) * proposal.duration();
            if proposal.verified_deal {
                verified_deal_weight += space_time;
            } else {
                deal_weight += space_time;
            }
        }

        Ok((deal_weight, verified_deal_weight))
    }
}

pub struct DealProposals<'bs, BS>(Amt<DealProposal, &'bs BS>);

impl<BS> DealProposals<'_, BS>
where
    BS: Blockstore,
{
    pub fn get(&self, id: DealID) -> anyhow::Result<Option<DealProposal>> {
        Ok(self.0.get(id)?.cloned())
    }

    pub fn for_each(
        &self,
        mut f: impl FnMut(DealID, &DealProposal) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        Ok(self.0.for_each(|id, proposal| f(id, proposal))?)
    }
}

pub struct DealStates<'bs, BS>(Amt<DealState, &'bs BS>);

impl<BS> DealStates<'_, BS>
where
    BS: Blockstore,
{
    pub fn get(&self, id: DealID) -> anyhow::Result<Option<DealState>> {
        Ok(self.0.get(id)?.copied())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct DealProposal {
    pub piece_cid: Cid,
    pub piece_size: PaddedPieceSize,
    pub verified_deal: bool,
    pub client: Address,
    pub provider: Address,
    pub label: String,
    pub start_epoch: ChainEpoch,
    pub end_epoch: ChainEpoch,
    pub storage_price_per_epoch: TokenAmount,
    pub provider_collateral: TokenAmount,
    pub client_collateral: TokenAmount,
}

impl DealProposal {
    pub fn duration(&self) -> ChainEpoch {
        self.end_epoch - self.start_epoch
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct DealState {
    /// -1 if not yet included in proven sector.
    pub sector_start_epoch: ChainEpoch,
    /// -1 if deal state never updated.
    pub last_updated_epoch: ChainEpoch,
    /// -1 if deal never slashed.
    pub slash_epoch: ChainEpoch,
}

impl DealState {
    /// The explicit sentinel for a deal that has a proposal on chain but has
    /// not been activated. Lookups substitute this rather than reporting an
    /// error or an absent record.
    pub const fn empty() -> Self {
        Self {
            sector_start_epoch: -1,
            last_updated_epoch: -1,
            slash_epoch: -1,
        }
    }
}

/// A deal proposal paired with its current state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarketDeal {
    pub proposal: DealProposal,
    pub state: DealState,
}

pub mod v8 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        /// Array of deal proposals, keyed by deal id.
        pub proposals: Cid,
        /// Array of deal states, keyed by deal id.
        pub states: Cid,
        /// Pending deal proposals by signed proposal hash.
        pub pending_proposals: Cid,
        /// Escrow balance table.
        pub escrow_table: Cid,
        /// Locked funds table, a subset of the escrow table.
        pub locked_table: Cid,
        pub next_id: DealID,
        /// Deal ids scheduled for processing, keyed by update epoch.
        pub deal_ops_by_epoch: Cid,
        pub last_cron: ChainEpoch,
        pub total_client_locked_collateral: TokenAmount,
        pub total_provider_locked_collateral: TokenAmount,
        pub total_client_storage_fee: TokenAmount,
    }
}

pub mod v9 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        pub proposals: Cid,
        pub states: Cid,
        pub pending_proposals: Cid,
        pub escrow_table: Cid,
        pub locked_table: Cid,
        pub next_id: DealID,
        pub deal_ops_by_epoch: Cid,
        pub last_cron: ChainEpoch,
        pub total_client_locked_collateral: TokenAmount,
        pub total_provider_locked_collateral: TokenAmount,
        pub total_client_storage_fee: TokenAmount,
        /// Verified registry allocation ids for deals that are pending
        /// activation, keyed by deal id.
        pub pending_deal_allocation_ids: Cid,
    }
}
