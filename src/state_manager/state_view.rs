// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_shared::address::{Address, Protocol};
use fvm_shared::sector::SectorNumber;
use fvm_shared::version::NetworkVersion;

use super::errors::{Error, ErrorContext as _};
use crate::actors::{
    account, market, miner, power, reward, ActorVersion, REWARD_ACTOR_ADDR,
    STORAGE_MARKET_ACTOR_ADDR, STORAGE_POWER_ACTOR_ADDR,
};
use crate::state_tree::{ActorState, StateTree};

/// A state root bound to its backing store: typed, version-dispatched access
/// to every actor in one state-tree snapshot. Views are cheap to construct
/// and safe to use from any number of concurrent callers.
pub struct StateView<'db, DB> {
    store: &'db DB,
    state_tree: StateTree<'db, DB>,
    root: Cid,
}

impl<'db, DB> StateView<'db, DB>
where
    DB: Blockstore,
{
    pub fn new(store: &'db DB, root: Cid) -> Result<Self, Error> {
        let state_tree = StateTree::new_from_root(store, &root)
            .map_err(|e| Error::Decode(format!("loading state root {root}: {e:#}")))?;
        Ok(Self {
            store,
            state_tree,
            root,
        })
    }

    pub fn root(&self) -> &Cid {
        &self.root
    }

    pub fn store(&self) -> &'db DB {
        self.store
    }

    pub fn state_tree(&self) -> &StateTree<'db, DB> {
        &self.state_tree
    }

    /// Looks up an actor record; absence is a normal negative result.
    pub fn actor(&self, addr: &Address) -> Result<Option<ActorState>, Error> {
        Ok(self.state_tree.get_actor(addr)?)
    }

    fn require_actor(&self, addr: &Address, what: &str) -> Result<ActorState, Error> {
        self.actor(addr)?
            .ok_or_else(|| Error::NotFound(format!("{what} actor {addr}")))
    }

    /// Loads a singleton system actor; absence here is state-tree corruption
    /// or a pre-genesis query, not a negative result.
    fn require_system_actor(&self, addr: &Address, what: &str) -> Result<ActorState, Error> {
        self.actor(addr)?.ok_or_else(|| {
            Error::DependencyMissing(format!("{what} actor {addr} in state root {}", self.root))
        })
    }

    pub fn miner_state(&self, addr: &Address) -> Result<miner::State, Error> {
        let actor = self.require_actor(addr, "miner")?;
        miner::State::load(self.store, &actor)
            .map_err(Error::from)
            .context("loading miner actor state")
    }

    pub fn market_state(&self) -> Result<market::State, Error> {
        let actor = self.require_system_actor(&STORAGE_MARKET_ACTOR_ADDR, "market")?;
        market::State::load(self.store, &actor)
            .map_err(Error::from)
            .context("loading market actor state")
    }

    pub fn power_state(&self) -> Result<power::State, Error> {
        let actor = self.require_system_actor(&STORAGE_POWER_ACTOR_ADDR, "power")?;
        power::State::load(self.store, &actor)
            .map_err(Error::from)
            .context("loading power actor state")
    }

    pub fn reward_state(&self) -> Result<reward::State, Error> {
        let actor = self.require_system_actor(&REWARD_ACTOR_ADDR, "reward")?;
        reward::State::load(self.store, &actor)
            .map_err(Error::from)
            .context("loading reward actor state")
    }

    /// Resolves an address down to the signing key address backing it,
    /// following ID resolution and the account actor indirection.
    pub fn resolve_to_key_addr(&self, addr: &Address) -> Result<Address, Error> {
        if addr.protocol() == Protocol::BLS || addr.protocol() == Protocol::Secp256k1 {
            return Ok(*addr);
        }

        let actor = self.require_actor(addr, "account")?;
        let account_state = account::State::load(self.store, &actor)
            .map_err(Error::from)
            .context("resolving key address")?;
        Ok(account_state.pubkey_address())
    }

    /// Static miner info. The caller passes the network version in force at
    /// the queried height; decoding under a schema from a different
    /// generation is a deployment defect surfaced loudly.
    pub fn miner_info(
        &self,
        addr: &Address,
        network_version: NetworkVersion,
    ) -> Result<miner::MinerInfo, Error> {
        let expected = ActorVersion::try_from(network_version).map_err(Error::from)?;
        let state = self.miner_state(addr)?;
        let actual = match &state {
            miner::State::V8(_) => ActorVersion::V8,
            miner::State::V9(_) => ActorVersion::V9,
        };
        if actual != expected {
            tracing::error!(
                "miner {addr} decoded under {actual}, but height implies {expected}"
            );
            return Err(Error::SchemaMismatch(format!(
                "miner {addr}: state is {actual}, network version {} implies {expected}",
                network_version as u32,
            )));
        }
        Ok(state.info(self.store)?)
    }

    pub fn miner_sector_info(
        &self,
        addr: &Address,
        sector_number: SectorNumber,
    ) -> Result<Option<miner::SectorOnChainInfo>, Error> {
        let state = self.miner_state(addr)?;
        Ok(state.get_sector(self.store, sector_number)?)
    }

    pub fn precommit_info(
        &self,
        addr: &Address,
        sector_number: SectorNumber,
    ) -> Result<Option<miner::SectorPreCommitOnChainInfo>, Error> {
        let state = self.miner_state(addr)?;
        Ok(state.get_precommitted_sector(self.store, sector_number)?)
    }

    pub fn sector_partition(
        &self,
        addr: &Address,
        sector_number: SectorNumber,
    ) -> Result<Option<miner::SectorLocation>, Error> {
        let state = self.miner_state(addr)?;
        Ok(state.find_sector(self.store, sector_number)?)
    }
}
