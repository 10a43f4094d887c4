// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::OnceLock;

use cid::multihash::{Code, MultihashDigest};
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;
use fvm_ipld_encoding::DAG_CBOR;
use fvm_shared::address::Address;
use fvm_shared::bigint::{bigint_ser, BigInt};
use fvm_shared::clock::ChainEpoch;
use fvm_shared::crypto::signature::Signature;
use fvm_shared::econ::TokenAmount;
use serde::{Deserialize, Serialize};

use super::{ElectionProof, Ticket, TipsetKey};
use crate::utils::db::CborStoreExt as _;
use crate::utils::encoding::blake2b_256;

#[derive(Deserialize_tuple, Serialize_tuple, Clone, Eq, PartialEq, Debug)]
pub struct RawBlockHeader {
    /// The address of the miner actor that mined this block
    pub miner_address: Address,
    pub ticket: Option<Ticket>,
    pub election_proof: Option<ElectionProof>,
    /// The set of parents this block was based on.
    /// Typically one, but can be several in the case where there were
    /// multiple winning ticket-holders for an epoch
    pub parents: TipsetKey,
    /// The aggregate chain weight of the parent set
    #[serde(with = "bigint_ser")]
    pub weight: BigInt,
    /// The period in which a new block is generated.
    /// There may be multiple rounds in an epoch.
    pub epoch: ChainEpoch,
    /// The CID of the parent state root after calculating parent tipset.
    pub state_root: Cid,
    /// The CID of the root of an array of `MessageReceipts`
    pub message_receipts: Cid,
    /// The CID of the Merkle links for `bls_messages` and `secp_messages`
    pub messages: Cid,
    /// Aggregate signature of miner in block
    pub bls_aggregate: Option<Signature>,
    /// Block creation time, in seconds since the Unix epoch
    pub timestamp: u64,
    pub signature: Option<Signature>,
    pub fork_signal: u64,
    /// The base fee of the parent block
    pub parent_base_fee: TokenAmount,
}

impl RawBlockHeader {
    pub fn cid(&self) -> Cid {
        let data = fvm_ipld_encoding::to_vec(self).expect("block serialization cannot fail");
        Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(&data))
    }

    /// The canonical ordering key for blocks within one tipset: the hash of
    /// the block's ticket, tie-broken by CID.
    pub(super) fn tipset_sort_key(&self) -> ([u8; 32], Vec<u8>) {
        let ticket_hash = self
            .ticket
            .as_ref()
            .map(|ticket| blake2b_256(ticket.vrfproof.as_bytes()))
            .unwrap_or_default();
        (ticket_hash, self.cid().to_bytes())
    }
}

/// A [`RawBlockHeader`] which caches the result of [`RawBlockHeader::cid`].
#[derive(Debug)]
pub struct CachingBlockHeader {
    uncached: RawBlockHeader,
    cid: OnceLock<Cid>,
}

impl std::ops::Deref for CachingBlockHeader {
    type Target = RawBlockHeader;

    fn deref(&self) -> &Self::Target {
        &self.uncached
    }
}

impl PartialEq for CachingBlockHeader {
    fn eq(&self, other: &Self) -> bool {
        // Epoch check is redundant but cheap.
        self.uncached.epoch == other.uncached.epoch && self.cid() == other.cid()
    }
}

impl Eq for CachingBlockHeader {}

impl Clone for CachingBlockHeader {
    fn clone(&self) -> Self {
        Self {
            uncached: self.uncached.clone(),
            cid: self.cid.clone(),
        }
    }
}

impl From<RawBlockHeader> for CachingBlockHeader {
    fn from(value: RawBlockHeader) -> Self {
        Self::new(value)
    }
}

impl CachingBlockHeader {
    pub fn new(uncached: RawBlockHeader) -> Self {
        Self {
            uncached,
            cid: OnceLock::new(),
        }
    }

    pub fn into_raw(self) -> RawBlockHeader {
        self.uncached
    }

    /// Returns [`None`] if the blockstore doesn't contain the CID.
    pub fn load(store: &impl Blockstore, cid: Cid) -> anyhow::Result<Option<Self>> {
        if let Some(uncached) = store.get_cbor::<RawBlockHeader>(&cid)? {
            Ok(Some(Self {
                uncached,
                cid: cid.into(),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn cid(&self) -> &Cid {
        self.cid.get_or_init(|| self.uncached.cid())
    }
}

impl Serialize for CachingBlockHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.uncached.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CachingBlockHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        RawBlockHeader::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
impl Default for RawBlockHeader {
    fn default() -> Self {
        use crate::blocks::VRFProof;
        Self {
            miner_address: Address::new_id(0),
            ticket: Some(Ticket::new(VRFProof::default())),
            election_proof: None,
            parents: TipsetKey::default(),
            weight: BigInt::default(),
            epoch: 0,
            state_root: Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(b"state")),
            message_receipts: Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(b"receipts")),
            messages: Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(b"messages")),
            bls_aggregate: None,
            timestamp: 0,
            signature: None,
            fork_signal: 0,
            parent_base_fee: TokenAmount::default(),
        }
    }
}

#[cfg(test)]
impl Default for CachingBlockHeader {
    fn default() -> Self {
        Self::new(RawBlockHeader::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDB;
    use crate::utils::db::CborStoreExt;

    #[test]
    fn symmetric_header_encoding() {
        let header = RawBlockHeader {
            epoch: 5,
            timestamp: 1234,
            ..Default::default()
        };
        let bytes = fvm_ipld_encoding::to_vec(&header).unwrap();
        let decoded: RawBlockHeader = fvm_ipld_encoding::from_slice(&bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(fvm_ipld_encoding::to_vec(&decoded).unwrap(), bytes);
    }

    #[test]
    fn cached_cid_matches_stored_cid() {
        let db = MemoryDB::default();
        let header = CachingBlockHeader::default();
        let cid = db.put_cbor_default(&header).unwrap();
        assert_eq!(&cid, header.cid());

        let loaded = CachingBlockHeader::load(&db, cid).unwrap().unwrap();
        assert_eq!(loaded, header);
    }

    #[test]
    fn load_missing_header_is_none() {
        let db = MemoryDB::default();
        let absent = Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(b"absent"));
        assert!(CachingBlockHeader::load(&db, absent).unwrap().is_none());
    }
}
