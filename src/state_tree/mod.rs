// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Read-only view over the persistent address → actor-record map rooted at a
//! state root content identifier. Updates are the interpreter's business;
//! this crate only ever resolves and reads snapshots, which is what makes
//! concurrent resolution race-free.

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_hamt::{BytesKey, Hamt};
use fvm_shared::address::{Address, Protocol};
use fvm_shared::econ::TokenAmount;
use fvm_shared::state::{StateRoot, StateTreeVersion};

use crate::actors::{init, INIT_ACTOR_ADDR};
use crate::utils::db::CborStoreExt as _;

const HAMT_BIT_WIDTH: u32 = 5;

/// One actor's record in a state-tree snapshot: code, state root, balance
/// and sequence number. Looked up, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ActorState {
    /// Identifies the actor's code, and with it the schema of its state.
    pub code: Cid,
    /// CID of the root of the actor's state.
    pub state: Cid,
    /// Sequence (nonce) of messages sent from this actor.
    pub sequence: u64,
    /// Token balance held by the actor.
    pub balance: TokenAmount,
}

impl ActorState {
    pub fn new(code: Cid, state: Cid, balance: TokenAmount, sequence: u64) -> Self {
        Self {
            code,
            state,
            sequence,
            balance,
        }
    }
}

/// State tree implementation using a HAMT. The tree is an immutable snapshot
/// addressed by its root; loading the same root twice observes identical
/// state.
pub struct StateTree<'db, BS> {
    hamt: Hamt<&'db BS, ActorState>,
    store: &'db BS,
    version: StateTreeVersion,
    #[allow(dead_code)]
    info: Option<Cid>,
}

impl<'db, BS> StateTree<'db, BS>
where
    BS: Blockstore,
{
    /// Loads a state tree from an IPLD store given a state root. Both the
    /// versioned wrapper and the legacy bare-map root are accepted.
    pub fn new_from_root(store: &'db BS, c: &Cid) -> anyhow::Result<Self> {
        let (version, info, actors) = match store.get_cbor::<StateRoot>(c) {
            Ok(Some(StateRoot {
                version,
                info,
                actors,
            })) => (version, Some(info), actors),
            // Fall back to a v0 state tree if the root is a bare map.
            _ => (StateTreeVersion::V0, None, *c),
        };

        let hamt = Hamt::load_with_bit_width(&actors, store, HAMT_BIT_WIDTH)
            .with_context(|| format!("failed to load state tree root {c}"))?;

        Ok(Self {
            hamt,
            store,
            version,
            info,
        })
    }

    pub fn version(&self) -> StateTreeVersion {
        self.version
    }

    pub fn store(&self) -> &'db BS {
        self.store
    }

    /// Get an actor's state from an address. The address is resolved to an
    /// ID address through the init actor if necessary.
    pub fn get_actor(&self, addr: &Address) -> anyhow::Result<Option<ActorState>> {
        let addr = match self.lookup_id(addr)? {
            Some(addr) => addr,
            None => return Ok(None),
        };
        Ok(self.hamt.get(&BytesKey(addr.to_bytes()))?.cloned())
    }

    /// Get an ID address from any address.
    pub fn lookup_id(&self, addr: &Address) -> anyhow::Result<Option<Address>> {
        if addr.protocol() == Protocol::ID {
            return Ok(Some(*addr));
        }

        let init_act = self
            .hamt
            .get(&BytesKey(INIT_ACTOR_ADDR.to_bytes()))?
            .context("init actor address could not be resolved")?;
        let state = init::State::load(self.store(), init_act)?;
        state.resolve_address(self.store(), addr)
    }

    pub fn for_each(
        &self,
        mut f: impl FnMut(Address, &ActorState) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        Ok(self.hamt.for_each(|key, actor| {
            let addr = Address::from_bytes(&key.0)?;
            f(addr, actor)
        })?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for assembling state-tree fixtures in an in-memory store.

    use super::*;
    use fvm_shared::ActorID;

    /// Writes a state tree with the given actors (keyed by ID address) plus
    /// an init actor, returning the wrapped state root.
    pub fn put_state_tree<BS: Blockstore>(
        store: &BS,
        version: crate::actors::ActorVersion,
        actors: Vec<(Address, ActorState)>,
        key_addresses: Vec<(Address, ActorID)>,
    ) -> Cid {
        use crate::actors::{code_id, ActorKind};

        let mut address_map = Hamt::<_, ActorID>::new_with_bit_width(store, HAMT_BIT_WIDTH);
        for (addr, id) in &key_addresses {
            address_map.set(BytesKey(addr.to_bytes()), *id).unwrap();
        }
        let address_map = address_map.flush().unwrap();
        let init_state = init::v9::State {
            address_map,
            next_id: 1000,
            network_name: "testnet".to_string(),
        };
        let init_head = store.put_cbor_default(&init_state).unwrap();

        let mut hamt = Hamt::<_, ActorState>::new_with_bit_width(store, HAMT_BIT_WIDTH);
        hamt.set(
            BytesKey(INIT_ACTOR_ADDR.to_bytes()),
            ActorState::new(
                code_id(ActorKind::Init, version),
                init_head,
                TokenAmount::default(),
                0,
            ),
        )
        .unwrap();
        for (addr, actor) in actors {
            hamt.set(BytesKey(addr.to_bytes()), actor).unwrap();
        }
        let actors = hamt.flush().unwrap();

        store
            .put_cbor_default(&StateRoot {
                version: StateTreeVersion::V4,
                actors,
                info: store.put_cbor_default(&()).unwrap(),
            })
            .unwrap()
    }
}
