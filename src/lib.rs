// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Chain-state resolution and block gossip admission for a Filecoin node.
//!
//! The crate is a pure reader over an externally maintained content-addressed
//! store. It resolves tipset keys to state roots, decodes actor state with the
//! schema that was in force at the queried height, answers multi-actor
//! economic queries, and gatekeeps blocks arriving over gossipsub before they
//! may influence local chain state.

pub mod actors;
pub mod blocks;
pub mod chain;
pub mod db;
pub mod libp2p;
pub mod metrics;
pub mod networks;
pub mod rpc_api;
pub mod state_manager;
pub mod state_tree;
pub mod utils;
