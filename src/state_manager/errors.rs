// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

use crate::actors::ActorError;

/// Failure kinds for state queries. The kind is the error's identity for
/// programmatic handling; the carried string is a chain of human-readable
/// context frames, built up as the error crosses call levels.
#[derive(Debug, Error)]
pub enum Error {
    /// A resolvable absence: actor, sector, deal or tipset outside the
    /// locally held range. A normal negative result, not a fault.
    #[error("not found: {0}")]
    NotFound(String),
    /// Malformed bytes for an expected schema.
    #[error("decode error: {0}")]
    Decode(String),
    /// A (kind, version) combination absent from the schema registry. A
    /// deployment defect, never bad input.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// A required system actor is absent from a state tree that must contain
    /// it. Signals state corruption or a pre-genesis query.
    #[error("required actor missing: {0}")]
    DependencyMissing(String),
    /// Caller-initiated or timeout-driven abandonment, propagated verbatim.
    #[error("cancelled: {0}")]
    Cancelled(String),
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Prepends a context frame, preserving the error kind.
    pub fn context(self, frame: impl std::fmt::Display) -> Self {
        match self {
            Error::NotFound(msg) => Error::NotFound(format!("{frame}: {msg}")),
            Error::Decode(msg) => Error::Decode(format!("{frame}: {msg}")),
            Error::SchemaMismatch(msg) => Error::SchemaMismatch(format!("{frame}: {msg}")),
            Error::DependencyMissing(msg) => {
                Error::DependencyMissing(format!("{frame}: {msg}"))
            }
            Error::Cancelled(msg) => Error::Cancelled(format!("{frame}: {msg}")),
            Error::Other(msg) => Error::Other(format!("{frame}: {msg}")),
        }
    }
}

/// Adds a context frame to the error of a `Result` without disturbing the
/// error kind.
pub trait ErrorContext<T> {
    fn context(self, frame: impl std::fmt::Display) -> Result<T, Error>;
}

impl<T> ErrorContext<T> for Result<T, Error> {
    fn context(self, frame: impl std::fmt::Display) -> Result<T, Error> {
        self.map_err(|e| e.context(frame))
    }
}

impl From<ActorError> for Error {
    fn from(e: ActorError) -> Self {
        match e {
            ActorError::UnknownCode { .. } | ActorError::UnsupportedNetworkVersion(_) => {
                Error::SchemaMismatch(e.to_string())
            }
            ActorError::MissingState { .. } | ActorError::Decode(_) => {
                Error::Decode(e.to_string())
            }
            ActorError::Other(e) => Error::Other(e.to_string()),
        }
    }
}

impl From<crate::chain::Error> for Error {
    fn from(e: crate::chain::Error) -> Self {
        match e {
            crate::chain::Error::NotFound(msg) => Error::NotFound(msg),
            other => Error::Other(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(format!("{e:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_preserves_kind() {
        let err = Error::NotFound("deal 5".into()).context("loading market state");
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.to_string(), "not found: loading market state: deal 5");
    }

    #[test]
    fn actor_errors_classify_by_kind() {
        let unknown = ActorError::UnsupportedNetworkVersion(3);
        assert!(matches!(Error::from(unknown), Error::SchemaMismatch(_)));

        let malformed = [0xa5u8, 0x01];
        let decode =
            ActorError::Decode(fvm_ipld_encoding::from_slice::<u64>(&malformed).unwrap_err());
        assert!(matches!(Error::from(decode), Error::Decode(_)));
    }
}
