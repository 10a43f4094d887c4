// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod store;

pub use store::*;

use thiserror::Error;

/// Chain store errors. `NotFound` is the normal negative result for keys and
/// heights outside the locally held chain range.
#[derive(Debug, Error)]
pub enum Error {
    /// Key was not found
    #[error("Invalid key: {0}")]
    UndefinedKey(String),
    /// Tipset not found in the local chain range
    #[error("Tipset not found: {0}")]
    NotFound(String),
    /// Tipset contains no blocks
    #[error("No blocks for tipset")]
    NoBlocks,
    #[error("{0}")]
    Other(String),
}

impl From<crate::blocks::Error> for Error {
    fn from(e: crate::blocks::Error) -> Self {
        match e {
            crate::blocks::Error::NoBlocks => Error::NoBlocks,
            other => Error::Other(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}
