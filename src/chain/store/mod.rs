// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod chain_store;
pub mod index;

pub use chain_store::{ChainStore, HeadChange, SINK_CAP};
pub use index::{ChainIndex, ResolveNullTipset};
