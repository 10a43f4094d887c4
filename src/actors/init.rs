// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_hamt::{BytesKey, Hamt};
use fvm_shared::address::{Address, Protocol};
use fvm_shared::ActorID;
use serde::Serialize;

use crate::actors::{load_state, require_version, ActorError, ActorKind, ActorVersion};
use crate::state_tree::ActorState;

pub const HAMT_BIT_WIDTH: u32 = 5;

/// Init actor state. Owns the mapping from key/actor addresses to the ID
/// addresses the state tree is keyed by.
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
        match require_version(ActorKind::Init, &actor.code)? {
            ActorVersion::V8 => load_state(store, &actor.state).map(State::V8),
            ActorVersion::V9 => load_state(store, &actor.state).map(State::V9),
        }
    }

    pub fn network_name(&self) -> &str {
        match self {
            State::V8(st) => &st.network_name,
            State::V9(st) => &st.network_name,
        }
    }

    /// Resolves an address to an ID address, if the address map holds it.
    /// ID addresses resolve to themselves.
    pub fn resolve_address<BS: Blockstore>(
        &self,
        store: &BS,
        addr: &Address,
    ) -> anyhow::Result<Option<Address>> {
        if addr.protocol() == Protocol::ID {
            return Ok(Some(*addr));
        }

        let address_map = match self {
            State::V8(st) => st.address_map,
            State::V9(st) => st.address_map,
        };
        let map: Hamt<_, ActorID> =
            Hamt::load_with_bit_width(&address_map, store, HAMT_BIT_WIDTH)
                .context("failed to load init actor address map")?;

        Ok(map
            .get(&BytesKey(addr.to_bytes()))?
            .copied()
            .map(Address::new_id))
    }
}

pub mod v8 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        pub address_map: Cid,
        pub next_id: ActorID,
        pub network_name: String,
    }
}

pub mod v9 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        pub address_map: Cid,
        pub next_id: ActorID,
        pub network_name: String,
    }
}
