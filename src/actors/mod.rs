// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Versioned access to the builtin actors' on-chain state.
//!
//! Every actor kind carries one schema per actor version. A `State` enum per
//! kind hides the version behind a uniform query surface; decoding dispatches
//! on the actor's code CID through the registry below. Adding support for a
//! network upgrade means adding one variant and one registry row, never
//! touching call sites.

pub mod account;
pub mod deadlines;
pub mod init;
pub mod market;
pub mod miner;
pub mod monies;
pub mod policy;
pub mod power;
pub mod reward;
pub mod system;

use cid::multihash::Multihash;
use cid::Cid;
use fvm_shared::address::Address;
use fvm_shared::version::NetworkVersion;
use once_cell::sync::Lazy;
use thiserror::Error;

/// Multicodec for raw bytes, used by builtin actor code CIDs.
const IPLD_RAW: u64 = 0x55;
/// Identity multihash code.
const IDENTITY_HASH: u64 = 0x0;

pub const SYSTEM_ACTOR_ADDR: Address = Address::new_id(0);
pub const INIT_ACTOR_ADDR: Address = Address::new_id(1);
pub const REWARD_ACTOR_ADDR: Address = Address::new_id(2);
pub const STORAGE_POWER_ACTOR_ADDR: Address = Address::new_id(4);
pub const STORAGE_MARKET_ACTOR_ADDR: Address = Address::new_id(5);
pub const RESERVE_ACTOR_ADDR: Address = Address::new_id(90);
pub const BURNT_FUNDS_ACTOR_ADDR: Address = Address::new_id(99);

/// Schema generation for the builtin actors. Exactly one generation is in
/// force at any height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActorVersion {
    V8,
    V9,
}

impl ActorVersion {
    fn as_str(&self) -> &'static str {
        match self {
            ActorVersion::V8 => "8",
            ActorVersion::V9 => "9",
        }
    }
}

impl std::fmt::Display for ActorVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.as_str())
    }
}

impl TryFrom<NetworkVersion> for ActorVersion {
    type Error = ActorError;

    fn try_from(version: NetworkVersion) -> Result<Self, Self::Error> {
        match version {
            NetworkVersion::V16 => Ok(ActorVersion::V8),
            NetworkVersion::V17 => Ok(ActorVersion::V9),
            other => Err(ActorError::UnsupportedNetworkVersion(other as u32)),
        }
    }
}

/// The builtin actor families this crate can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    System,
    Init,
    Account,
    Power,
    Miner,
    Market,
    Reward,
}

impl ActorKind {
    fn key(&self) -> &'static str {
        match self {
            ActorKind::System => "system",
            ActorKind::Init => "init",
            ActorKind::Account => "account",
            ActorKind::Power => "storagepower",
            ActorKind::Miner => "storageminer",
            ActorKind::Market => "storagemarket",
            ActorKind::Reward => "reward",
        }
    }
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Builds a builtin actor code CID: the identity multihash of
/// `fil/<version>/<name>`, raw codec.
fn make_builtin(bz: &[u8]) -> Cid {
    Cid::new_v1(
        IPLD_RAW,
        Multihash::wrap(IDENTITY_HASH, bz).expect("identity hash of short name cannot fail"),
    )
}

const VERSIONS: [ActorVersion; 2] = [ActorVersion::V8, ActorVersion::V9];
const KINDS: [ActorKind; 7] = [
    ActorKind::System,
    ActorKind::Init,
    ActorKind::Account,
    ActorKind::Power,
    ActorKind::Miner,
    ActorKind::Market,
    ActorKind::Reward,
];

/// Closed registry of every `(kind, version)` pair this build understands.
/// A code CID absent from this table is a schema gap, not bad input.
static CODE_REGISTRY: Lazy<Vec<(Cid, ActorKind, ActorVersion)>> = Lazy::new(|| {
    let mut table = Vec::with_capacity(KINDS.len() * VERSIONS.len());
    for kind in KINDS {
        for version in VERSIONS {
            table.push((code_id(kind, version), kind, version));
        }
    }
    table
});

/// The code CID for an actor kind at a schema generation.
pub fn code_id(kind: ActorKind, version: ActorVersion) -> Cid {
    make_builtin(format!("fil/{}/{}", version.as_str(), kind.key()).as_bytes())
}

/// Resolves a code CID to its actor kind and version. `None` for code this
/// build has no decoder for.
pub fn kind_and_version(code: &Cid) -> Option<(ActorKind, ActorVersion)> {
    CODE_REGISTRY
        .iter()
        .find(|(c, _, _)| c == code)
        .map(|&(_, kind, version)| (kind, version))
}

pub fn is_account_actor(code: &Cid) -> bool {
    matches!(kind_and_version(code), Some((ActorKind::Account, _)))
}

pub fn is_miner_actor(code: &Cid) -> bool {
    matches!(kind_and_version(code), Some((ActorKind::Miner, _)))
}

/// Resolves the version of a code CID, insisting it belongs to `kind`. The
/// error is loud on purpose: an unknown combination means a missing upgrade
/// handler, not malformed chain data.
pub(crate) fn require_version(kind: ActorKind, code: &Cid) -> Result<ActorVersion, ActorError> {
    match kind_and_version(code) {
        Some((k, version)) if k == kind => Ok(version),
        _ => {
            tracing::error!("no registered {kind} actor schema for code {code}");
            Err(ActorError::UnknownCode { kind, code: *code })
        }
    }
}

/// Failures surfaced by the versioned state loaders.
#[derive(Debug, Error)]
pub enum ActorError {
    /// The `(kind, version)` pair is absent from the registry.
    #[error("unknown {kind} actor code {code}")]
    UnknownCode { kind: ActorKind, code: Cid },
    /// The network version predates the oldest supported schema.
    #[error("no actor schema registered for network version {0}")]
    UnsupportedNetworkVersion(u32),
    /// The state root does not resolve to any record in the store.
    #[error("actor state {root} is not present in the block store")]
    MissingState { root: Cid },
    /// Bytes were present but do not parse under the selected schema.
    #[error("malformed actor state: {0}")]
    Decode(#[from] fvm_ipld_encoding::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Loads and decodes an actor state record, classifying the two failure
/// modes (missing bytes vs. malformed bytes) separately.
pub(crate) fn load_state<T, BS>(store: &BS, root: &Cid) -> Result<T, ActorError>
where
    T: serde::de::DeserializeOwned,
    BS: fvm_ipld_blockstore::Blockstore,
{
    let bytes = store
        .get(root)
        .map_err(ActorError::Other)?
        .ok_or(ActorError::MissingState { root: *root })?;
    Ok(fvm_ipld_encoding::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_injective() {
        for kind in KINDS {
            for version in VERSIONS {
                let code = code_id(kind, version);
                assert_eq!(kind_and_version(&code), Some((kind, version)));
            }
        }
    }

    #[test]
    fn unknown_code_is_not_resolved() {
        let foreign = make_builtin(b"fil/7/storageminer");
        assert_eq!(kind_and_version(&foreign), None);
        assert!(require_version(ActorKind::Miner, &foreign).is_err());
    }

    #[test]
    fn network_version_maps_to_schema_generation() {
        assert_eq!(
            ActorVersion::try_from(NetworkVersion::V16).unwrap(),
            ActorVersion::V8
        );
        assert_eq!(
            ActorVersion::try_from(NetworkVersion::V17).unwrap(),
            ActorVersion::V9
        );
        assert!(ActorVersion::try_from(NetworkVersion::V15).is_err());
    }
}
