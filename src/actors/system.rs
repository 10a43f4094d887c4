// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use serde::Serialize;

use crate::actors::{load_state, require_version, ActorError, ActorKind, ActorVersion};
use crate::state_tree::ActorState;

/// System actor state.
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
        match require_version(ActorKind::System, &actor.code)? {
            ActorVersion::V8 => load_state(store, &actor.state).map(State::V8),
            ActorVersion::V9 => load_state(store, &actor.state).map(State::V9),
        }
    }

    /// The manifest of builtin actor code, where the schema records one.
    pub fn builtin_actors(&self) -> Option<Cid> {
        match self {
            State::V8(_) => None,
            State::V9(st) => Some(st.builtin_actors),
        }
    }
}

pub mod v8 {
    use super::*;

    /// The system actor predates the bundled-code manifest; its state is an
    /// empty placeholder kept for the tree shape.
    #[derive(Debug, Default, Deserialize_tuple)]
    pub struct State {}

    // `Serialize_tuple` cannot be derived for a field-less struct in
    // serde_tuple 0.5.0 (the generated helper carries an unused lifetime,
    // triggering E0392). This hand-written impl reproduces the derive's exact
    // output: an empty CBOR tuple, i.e. the array `0x80`.
    impl serde::Serialize for State {
        fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            use serde::ser::SerializeTuple;
            serializer.serialize_tuple(0)?.end()
        }
    }
}

pub mod v9 {
    use super::*;

    #[derive(Debug, Serialize_tuple, Deserialize_tuple)]
    pub struct State {
        pub builtin_actors: Cid,
    }
}
