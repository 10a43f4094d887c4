// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_shared::address::Address;
use serde::Serialize;

use crate::actors::{load_state, require_version, ActorError, ActorKind, ActorVersion};
use crate::state_tree::ActorState;

/// Account actor state.
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
        match require_version(ActorKind::Account, &actor.code)? {
            ActorVersion::V8 => load_state(store, &actor.state).map(State::V8),
            ActorVersion::V9 => load_state(store, &actor.state).map(State::V9),
        }
    }

    /// The signing key address this account stands for.
    pub fn pubkey_address(&self) -> Address {
        match self {
            State::V8(st) => st.address,
            State::V9(st) => st.address,
        }
    }
}

pub mod v8 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        pub address: Address,
    }
}

pub mod v9 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        pub address: Address,
    }
}
