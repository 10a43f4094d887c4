// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod circulating_supply;
mod errors;
mod state_view;

pub use circulating_supply::{CirculatingSupply, GenesisInfo};
pub use errors::{Error, ErrorContext};
pub use state_view::StateView;

use std::future::Future;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;
use fvm_shared::address::Address;
use fvm_shared::clock::ChainEpoch;
use fvm_shared::deal::DealID;
use fvm_shared::econ::TokenAmount;
use fvm_shared::sector::{SectorNumber, SectorSize, StoragePower};
use fvm_shared::version::NetworkVersion;
use serde::Serialize;
use tracing::instrument;

use crate::actors::deadlines::DeadlineInfo;
use crate::actors::market::{DealState, MarketDeal};
use crate::actors::miner::{
    MinerInfo, MinerPower, SectorLocation, SectorOnChainInfo, SectorPreCommitInfo,
    SectorPreCommitOnChainInfo,
};
use crate::actors::policy::qa_power_for_weight;
use crate::actors::power::Claim;
use crate::blocks::{Tipset, TipsetKey};
use crate::chain::{ChainStore, ResolveNullTipset};
use crate::networks::ChainConfig;

/// Safety margin applied to the protocol's deposit and pledge figures,
/// multiply-then-divide with truncation.
const INITIAL_PLEDGE_NUM: u32 = 110;
const INITIAL_PLEDGE_DEN: u32 = 100;

/// Per-partition sector-set snapshot, as returned by
/// [`StateManager::miner_partitions`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerPartitions {
    pub all_sectors: BitField,
    pub faulty_sectors: BitField,
    pub recovering_sectors: BitField,
    pub live_sectors: BitField,
    pub active_sectors: BitField,
}

/// Per-deadline snapshot, as returned by [`StateManager::miner_deadlines`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiDeadline {
    pub post_submissions: BitField,
}

/// Answers high-level chain-state questions by composing tipset resolution,
/// the state view and the versioned actor loaders. Holds no long-lived
/// locks; safe to share across any number of concurrent query tasks.
pub struct StateManager<DB> {
    cs: Arc<ChainStore<DB>>,
    chain_config: Arc<ChainConfig>,
    genesis_info: GenesisInfo,
}

impl<DB> StateManager<DB>
where
    DB: Blockstore,
{
    pub fn new(cs: Arc<ChainStore<DB>>) -> Result<Self, Error> {
        let chain_config = cs.chain_config().clone();
        let genesis_info = GenesisInfo::from_chain_config(&chain_config);
        Ok(Self {
            cs,
            chain_config,
            genesis_info,
        })
    }

    pub fn chain_store(&self) -> &Arc<ChainStore<DB>> {
        &self.cs
    }

    pub fn blockstore(&self) -> &DB {
        self.cs.blockstore()
    }

    pub fn chain_config(&self) -> &Arc<ChainConfig> {
        &self.chain_config
    }

    /// Returns the network version in force at the given epoch.
    pub fn get_network_version(&self, epoch: ChainEpoch) -> NetworkVersion {
        self.chain_config.network_version(epoch)
    }

    /// Resolves a tipset key to a concrete tipset. The empty key means "the
    /// current head", resolved exactly once at call time.
    pub fn resolve_tipset(&self, tsk: &TipsetKey) -> Result<Arc<Tipset>, Error> {
        Ok(self.cs.tipset_from_keys(tsk)?)
    }

    /// Resolves the tipset at `height` on the branch anchored by
    /// `anchor_key`. If `height` is a null round, the nearest ancestor at a
    /// lower height is returned, never a descendant and never a tipset from
    /// another branch.
    pub fn resolve_tipset_at_height(
        &self,
        height: ChainEpoch,
        anchor_key: &TipsetKey,
    ) -> Result<Arc<Tipset>, Error> {
        let anchor = self.resolve_tipset(anchor_key)?;
        Ok(self
            .cs
            .chain_index
            .tipset_by_height(height, anchor, ResolveNullTipset::TakeOlder)?)
    }

    /// Binds a state view to the state produced by executing the parents of
    /// the tipset at `tsk`: the state "as of" that tipset.
    pub fn parent_state_view(
        &self,
        tsk: &TipsetKey,
    ) -> Result<(Arc<Tipset>, StateView<'_, DB>), Error> {
        let ts = self.resolve_tipset(tsk)?;
        let view = StateView::new(self.blockstore(), *ts.parent_state())?;
        Ok((ts, view))
    }

    /// Whether the miner has ever allocated the given sector number.
    pub fn miner_sector_allocated(
        &self,
        miner: &Address,
        sector_number: SectorNumber,
        tsk: &TipsetKey,
    ) -> Result<bool, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let state = view.miner_state(miner)?;
        Ok(state.is_allocated(view.store(), sector_number)?)
    }

    /// On-chain pre-commit info for a sector. Absence is `NotFound`.
    pub fn sector_precommit_info(
        &self,
        miner: &Address,
        sector_number: SectorNumber,
        tsk: &TipsetKey,
    ) -> Result<SectorPreCommitOnChainInfo, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        view.precommit_info(miner, sector_number)?
            .ok_or_else(|| Error::NotFound(format!("precommit info for sector {sector_number}")))
    }

    /// On-chain info for a proven sector, `None` if the miner has no such
    /// sector.
    pub fn sector_get_info(
        &self,
        miner: &Address,
        sector_number: SectorNumber,
        tsk: &TipsetKey,
    ) -> Result<Option<SectorOnChainInfo>, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        view.miner_sector_info(miner, sector_number)
    }

    /// The deadline and partition the sector is due at. Absence is
    /// `NotFound`.
    pub fn sector_partition(
        &self,
        miner: &Address,
        sector_number: SectorNumber,
        tsk: &TipsetKey,
    ) -> Result<SectorLocation, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        view.sector_partition(miner, sector_number)?
            .ok_or_else(|| {
                Error::NotFound(format!("sector {sector_number} not due at any deadline"))
            })
    }

    /// Static miner info, decoded under the schema in force at the resolved
    /// tipset's height.
    pub fn miner_info(&self, miner: &Address, tsk: &TipsetKey) -> Result<MinerInfo, Error> {
        let (ts, view) = self.parent_state_view(tsk)?;
        let network_version = self.get_network_version(ts.epoch());
        view.miner_info(miner, network_version)
            .context("loading miner info")
    }

    /// The miner's worker address, derived from miner info.
    pub fn miner_worker_address(
        &self,
        miner: &Address,
        tsk: &TipsetKey,
    ) -> Result<Address, Error> {
        Ok(self.miner_info(miner, tsk)?.worker())
    }

    /// The miner's sector size, derived from miner info.
    pub fn miner_sector_size(
        &self,
        miner: &Address,
        tsk: &TipsetKey,
    ) -> Result<SectorSize, Error> {
        Ok(self.miner_info(miner, tsk)?.sector_size())
    }

    /// All currently faulty sector numbers, across every deadline and
    /// partition.
    #[instrument(skip(self, tsk))]
    pub fn miner_faults(&self, miner: &Address, tsk: &TipsetKey) -> Result<BitField, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let state = view.miner_state(miner)?;
        Ok(state.all_part_sectors(view.store(), |part| part.faulty_sectors().clone())?)
    }

    /// All sector numbers expected to recover at the next proof, across
    /// every deadline and partition.
    #[instrument(skip(self, tsk))]
    pub fn miner_recoveries(&self, miner: &Address, tsk: &TipsetKey) -> Result<BitField, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let state = view.miner_state(miner)?;
        Ok(state.all_part_sectors(view.store(), |part| part.recovering_sectors().clone())?)
    }

    /// The next proving deadline for the miner that has not yet elapsed at
    /// the resolved tipset's epoch.
    pub fn miner_proving_deadline(
        &self,
        miner: &Address,
        tsk: &TipsetKey,
    ) -> Result<DeadlineInfo, Error> {
        let (ts, view) = self.parent_state_view(tsk)?;
        let state = view.miner_state(miner)?;
        Ok(state
            .deadline_info(&self.chain_config.policy, ts.epoch())
            .next_not_elapsed())
    }

    /// Sector-set snapshots for every partition of one deadline.
    pub fn miner_partitions(
        &self,
        miner: &Address,
        deadline_index: u64,
        tsk: &TipsetKey,
    ) -> Result<Vec<MinerPartitions>, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let state = view.miner_state(miner)?;
        let deadline = state
            .load_deadline(view.store(), deadline_index)?
            .ok_or_else(|| Error::NotFound(format!("deadline {deadline_index}")))?;

        let mut out = Vec::new();
        deadline.for_each_partition(view.store(), |_, part| {
            out.push(MinerPartitions {
                all_sectors: part.all_sectors().clone(),
                faulty_sectors: part.faulty_sectors().clone(),
                recovering_sectors: part.recovering_sectors().clone(),
                live_sectors: part.live_sectors(),
                active_sectors: part.active_sectors(),
            });
            Ok(())
        })?;
        Ok(out)
    }

    /// Proof-submission snapshots for every deadline of the miner.
    pub fn miner_deadlines(
        &self,
        miner: &Address,
        tsk: &TipsetKey,
    ) -> Result<Vec<ApiDeadline>, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let state = view.miner_state(miner)?;
        let mut out = Vec::new();
        state.for_each_deadline(view.store(), |_, deadline| {
            out.push(ApiDeadline {
                post_submissions: deadline.post_submissions(),
            });
            Ok(())
        })?;
        Ok(out)
    }

    /// The miner's sectors, filtered by the bitfield if one is given.
    pub fn miner_sectors(
        &self,
        miner: &Address,
        sectors: Option<&BitField>,
        tsk: &TipsetKey,
    ) -> Result<Vec<SectorOnChainInfo>, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let state = view.miner_state(miner)?;
        Ok(state.load_sectors(view.store(), sectors)?)
    }

    /// Sector records for every sector actively contributing power.
    pub fn miner_active_sectors(
        &self,
        miner: &Address,
        tsk: &TipsetKey,
    ) -> Result<Vec<SectorOnChainInfo>, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let state = view.miner_state(miner)?;
        let active = state
            .all_part_sectors(view.store(), |part| part.active_sectors())
            .map_err(|e| Error::Other(format!("merging partition active sets: {e:#}")))?;
        Ok(state.load_sectors(view.store(), Some(&active))?)
    }

    /// The miner's power claim against the network totals.
    pub fn miner_power(&self, miner: &Address, tsk: &TipsetKey) -> Result<MinerPower, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let power_state = view.power_state()?;
        let total_power = power_state.total_power();
        let miner_power = power_state
            .miner_power(view.store(), miner)?
            .unwrap_or_else(Claim::default);
        let has_min_power =
            miner_power.quality_adj_power >= self.chain_config.policy.minimum_consensus_power;
        Ok(MinerPower {
            miner_power,
            total_power,
            has_min_power,
        })
    }

    /// A deal's proposal paired with its state. A deal whose proposal is on
    /// chain but which has not been activated yet carries the explicit empty
    /// state, never an error. An unknown deal id is `NotFound`.
    pub fn market_storage_deal(
        &self,
        deal_id: DealID,
        tsk: &TipsetKey,
    ) -> Result<MarketDeal, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let market_state = view.market_state()?;
        let store = view.store();

        let proposal = market_state
            .proposals(store)?
            .get(deal_id)?
            .ok_or_else(|| Error::NotFound(format!("deal {deal_id}")))?;

        let state = market_state
            .states(store)?
            .get(deal_id)?
            .unwrap_or_else(DealState::empty);

        Ok(MarketDeal { proposal, state })
    }

    /// Every deal in the market actor, keyed by deal id.
    pub fn market_deals(&self, tsk: &TipsetKey) -> Result<HashMap<String, MarketDeal>, Error> {
        let (_, view) = self.parent_state_view(tsk)?;
        let market_state = view.market_state()?;
        let store = view.store();

        let states = market_state.states(store)?;
        let mut out = HashMap::new();
        market_state.proposals(store)?.for_each(|deal_id, proposal| {
            let state = states.get(deal_id)?.unwrap_or_else(DealState::empty);
            out.insert(
                deal_id.to_string(),
                MarketDeal {
                    proposal: proposal.clone(),
                    state,
                },
            );
            Ok(())
        })?;
        Ok(out)
    }

    /// The quality-adjusted power a pre-committed sector would carry,
    /// verified against the market's deal records.
    fn sector_weight(
        &self,
        view: &StateView<'_, DB>,
        miner: &Address,
        pci: &SectorPreCommitInfo,
        curr_epoch: ChainEpoch,
    ) -> Result<StoragePower, Error> {
        let sector_size = pci
            .seal_proof
            .sector_size()
            .map_err(|e| Error::Other(format!("failed to resolve sector size: {e}")))?;

        let market_state = view.market_state()?;
        let (deal_weight, verified_deal_weight) = market_state
            .verify_deals_for_activation(
                view.store(),
                miner,
                &pci.deal_ids,
                curr_epoch,
                pci.expiration,
            )
            .map_err(|e| Error::Other(format!("verifying deals for activation: {e:#}")))?;

        // NB: not exactly accurate, but should always lead us to *over*
        // estimate, not under.
        let duration = pci.expiration - curr_epoch;
        Ok(qa_power_for_weight(
            sector_size,
            duration,
            &deal_weight,
            &verified_deal_weight,
        ))
    }

    /// The deposit required to pre-commit the described sector, with the
    /// protocol's 110/100 safety margin applied. A missing market, power or
    /// reward actor is fatal to the call.
    pub fn miner_pre_commit_deposit_for_power(
        &self,
        miner: &Address,
        pci: &SectorPreCommitInfo,
        tsk: &TipsetKey,
    ) -> Result<TokenAmount, Error> {
        let (ts, view) = self.parent_state_view(tsk)?;

        let sector_weight = self.sector_weight(&view, miner, pci, ts.epoch())?;
        let power_smoothed = view.power_state()?.total_power_smoothed();
        let deposit = view
            .reward_state()?
            .pre_commit_deposit_for_power(&power_smoothed, &sector_weight);

        Ok((deposit * INITIAL_PLEDGE_NUM).div_floor(INITIAL_PLEDGE_DEN))
    }

    /// The initial pledge collateral required to commit the described
    /// sector, with the protocol's 110/100 safety margin applied. Consumes
    /// the circulating supply replayed at the resolved state root.
    pub fn miner_initial_pledge_collateral(
        &self,
        miner: &Address,
        pci: &SectorPreCommitInfo,
        tsk: &TipsetKey,
    ) -> Result<TokenAmount, Error> {
        let (ts, view) = self.parent_state_view(tsk)?;

        let sector_weight = self.sector_weight(&view, miner, pci, ts.epoch())?;

        let power_state = view.power_state()?;
        let power_smoothed = power_state.total_power_smoothed();
        let pledge_collateral = power_state.total_locked();

        let circ_supply = self
            .genesis_info
            .get_circulating_supply_detailed(ts.epoch(), &view)
            .context("getting circulating supply")?;

        let initial_pledge = view.reward_state()?.initial_pledge_for_power(
            &sector_weight,
            &pledge_collateral,
            &power_smoothed,
            &circ_supply.fil_circulating,
        );

        Ok((initial_pledge * INITIAL_PLEDGE_NUM).div_floor(INITIAL_PLEDGE_DEN))
    }

    /// The full circulating-supply breakdown at the resolved state root.
    pub fn vm_circulating_supply_detailed(
        &self,
        tsk: &TipsetKey,
    ) -> Result<CirculatingSupply, Error> {
        let (ts, view) = self.parent_state_view(tsk)?;
        self.genesis_info
            .get_circulating_supply_detailed(ts.epoch(), &view)
    }

    /// The token amount in circulation at the resolved state root.
    pub fn circulating_supply(&self, tsk: &TipsetKey) -> Result<TokenAmount, Error> {
        Ok(self.vm_circulating_supply_detailed(tsk)?.fil_circulating)
    }
}

/// Races a query against a caller-supplied cancellation future. When the
/// cancellation fires first the query is abandoned and [`Error::Cancelled`]
/// is returned promptly; no retry is attempted here.
pub async fn with_cancellation<T, W, C>(work: W, cancel: C) -> Result<T, Error>
where
    W: Future<Output = Result<T, Error>>,
    C: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = cancel => Err(Error::Cancelled("query abandoned by caller".to_string())),
        res = work => res,
    }
}
