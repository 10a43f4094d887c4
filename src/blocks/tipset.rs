// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;
use std::sync::OnceLock;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_shared::bigint::BigInt;
use fvm_shared::clock::ChainEpoch;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{CachingBlockHeader, Error};

/// An immutable set of block CIDs forming a unique key for a tipset.
///
/// Keys canonicalise to sorted, deduplicated CIDs at construction, so two
/// keys built from the same CIDs in any order compare equal, and a key
/// derived from a tipset's headers equals one built by hand from the same
/// CIDs. The empty key is the "no constraint, use current head" sentinel for
/// query interfaces; it never names an actual tipset.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TipsetKey {
    cids: Vec<Cid>,
}

impl TipsetKey {
    pub fn new(cids: impl IntoIterator<Item = Cid>) -> Self {
        let mut cids: Vec<Cid> = cids.into_iter().collect();
        cids.sort();
        cids.dedup();
        Self { cids }
    }

    pub fn cids(&self) -> &[Cid] {
        &self.cids
    }

    pub fn into_cids(self) -> Vec<Cid> {
        self.cids
    }

    /// True for the "use current head" sentinel.
    pub fn is_empty(&self) -> bool {
        self.cids.is_empty()
    }
}

impl FromIterator<Cid> for TipsetKey {
    fn from_iter<I: IntoIterator<Item = Cid>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for TipsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self
            .cids
            .iter()
            .map(|cid| cid.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{{s}}}")
    }
}

impl Serialize for TipsetKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cids.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TipsetKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(Vec::<Cid>::deserialize(deserializer)?))
    }
}

/// A non-empty group of blocks belonging to the same epoch and sharing the
/// same parents, forming one consensus frontier. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct Tipset {
    /// Sorted by the canonical block ordering (ticket hash, then CID).
    headers: Vec<CachingBlockHeader>,
    key: OnceLock<TipsetKey>,
}

impl PartialEq for Tipset {
    fn eq(&self, other: &Self) -> bool {
        self.headers == other.headers
    }
}

impl Eq for Tipset {}

impl From<CachingBlockHeader> for Tipset {
    fn from(header: CachingBlockHeader) -> Self {
        Self {
            headers: vec![header],
            key: OnceLock::new(),
        }
    }
}

impl From<super::RawBlockHeader> for Tipset {
    fn from(header: super::RawBlockHeader) -> Self {
        Tipset::from(CachingBlockHeader::new(header))
    }
}

impl Tipset {
    /// Builds a tipset from a group of headers, validating the tipset
    /// invariants: non-empty, all blocks at the same epoch with the same
    /// parents. Duplicate blocks are dropped; the canonical ordering is
    /// applied regardless of input order.
    pub fn new(headers: impl IntoIterator<Item = CachingBlockHeader>) -> Result<Self, Error> {
        let mut headers: Vec<CachingBlockHeader> = headers.into_iter().collect();
        if headers.is_empty() {
            return Err(Error::NoBlocks);
        }

        let epoch = headers[0].epoch;
        let parents = headers[0].parents.clone();
        for header in &headers[1..] {
            if header.epoch != epoch {
                return Err(Error::InvalidTipset(format!(
                    "block at epoch {} in tipset at epoch {epoch}",
                    header.epoch
                )));
            }
            if header.parents != parents {
                return Err(Error::InvalidTipset(
                    "blocks with different parents in one tipset".to_string(),
                ));
            }
        }

        headers.sort_by_cached_key(|header| header.tipset_sort_key());
        headers.dedup_by(|a, b| a.cid() == b.cid());

        Ok(Self {
            headers,
            key: OnceLock::new(),
        })
    }

    /// Loads a tipset's headers from the store. Returns `None` if any block
    /// named by the key is absent.
    pub fn load(store: &impl Blockstore, tsk: &TipsetKey) -> anyhow::Result<Option<Tipset>> {
        let mut headers = Vec::with_capacity(tsk.cids().len());
        for cid in tsk.cids() {
            match CachingBlockHeader::load(store, *cid)? {
                Some(header) => headers.push(header),
                None => return Ok(None),
            }
        }
        if headers.is_empty() {
            return Ok(None);
        }
        Ok(Some(Tipset::new(headers)?))
    }

    /// Returns the blocks of the tipset in canonical order.
    pub fn block_headers(&self) -> &[CachingBlockHeader] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns the unique key of the tipset.
    pub fn key(&self) -> &TipsetKey {
        self.key
            .get_or_init(|| self.headers.iter().map(|header| *header.cid()).collect())
    }

    pub fn cids(&self) -> Vec<Cid> {
        self.key().cids().to_vec()
    }

    /// Epoch this tipset was created in.
    pub fn epoch(&self) -> ChainEpoch {
        self.headers[0].epoch
    }

    /// The key of the parent tipset all of this tipset's blocks build on.
    pub fn parents(&self) -> &TipsetKey {
        &self.headers[0].parents
    }

    /// The state root produced by executing the parent tipset. Queries "as
    /// of" this tipset resolve actor state at this root.
    pub fn parent_state(&self) -> &Cid {
        &self.headers[0].state_root
    }

    /// The aggregate chain weight claimed by this tipset's headers.
    pub fn weight(&self) -> &BigInt {
        &self.headers[0].weight
    }

    /// The block with the smallest ticket, which proposes the messages the
    /// tipset executes first.
    pub fn min_ticket_block(&self) -> &CachingBlockHeader {
        // Headers are sorted by ticket on construction.
        &self.headers[0]
    }

    /// Returns the smallest timestamp of all blocks in the tipset.
    pub fn min_timestamp(&self) -> u64 {
        self.headers
            .iter()
            .map(|header| header.timestamp)
            .min()
            .expect("tipset is non-empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{RawBlockHeader, Ticket, VRFProof};
    use crate::db::MemoryDB;
    use crate::utils::db::CborStoreExt;

    fn header(epoch: ChainEpoch, ticket_seed: u8) -> CachingBlockHeader {
        CachingBlockHeader::new(RawBlockHeader {
            epoch,
            ticket: Some(Ticket::new(VRFProof::new(vec![ticket_seed; 4]))),
            ..Default::default()
        })
    }

    #[quickcheck_macros::quickcheck]
    fn key_is_canonical_for_any_insertion_order(seeds: Vec<Vec<u8>>) -> bool {
        use cid::multihash::{Code, MultihashDigest};
        let cids: Vec<Cid> = seeds
            .iter()
            .map(|seed| Cid::new_v1(fvm_ipld_encoding::DAG_CBOR, Code::Blake2b256.digest(seed)))
            .collect();

        let mut reversed = cids.clone();
        reversed.reverse();
        let mut doubled = cids.clone();
        doubled.extend(cids.iter().cloned());

        TipsetKey::new(cids.clone()) == TipsetKey::new(reversed)
            && TipsetKey::new(cids.clone()) == TipsetKey::new(doubled)
    }

    #[test]
    fn key_equality_is_structural() {
        let a = header(1, 1);
        let b = header(1, 2);

        let forward = TipsetKey::new([*a.cid(), *b.cid()]);
        let backward = TipsetKey::new([*b.cid(), *a.cid()]);
        assert_eq!(forward, backward);

        // Duplicates collapse.
        let dup = TipsetKey::new([*a.cid(), *a.cid(), *b.cid()]);
        assert_eq!(dup, forward);
    }

    #[test]
    fn key_serialization_round_trips_canonically() {
        let a = header(1, 1);
        let b = header(1, 2);
        let key = TipsetKey::new([*b.cid(), *a.cid()]);

        let bytes = fvm_ipld_encoding::to_vec(&key).unwrap();
        let decoded: TipsetKey = fvm_ipld_encoding::from_slice(&bytes).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn tipset_key_matches_hand_built_key() {
        let a = header(1, 1);
        let b = header(1, 2);
        let ts = Tipset::new([a.clone(), b.clone()]).unwrap();
        assert_eq!(ts.key(), &TipsetKey::new([*b.cid(), *a.cid()]));
    }

    #[test]
    fn mixed_epochs_are_rejected() {
        let a = header(1, 1);
        let b = header(2, 2);
        assert!(matches!(
            Tipset::new([a, b]),
            Err(Error::InvalidTipset(_))
        ));
    }

    #[test]
    fn empty_tipset_is_rejected() {
        assert_eq!(Tipset::new([]).unwrap_err(), Error::NoBlocks);
    }

    #[test]
    fn load_returns_none_for_partial_tipsets() {
        let db = MemoryDB::default();
        let a = header(1, 1);
        let b = header(1, 2);
        db.put_cbor_default(&a).unwrap();

        let key = TipsetKey::new([*a.cid(), *b.cid()]);
        assert!(Tipset::load(&db, &key).unwrap().is_none());

        db.put_cbor_default(&b).unwrap();
        let ts = Tipset::load(&db, &key).unwrap().unwrap();
        assert_eq!(ts.key(), &key);
    }

    #[test]
    fn min_ticket_block_is_first() {
        let a = header(1, 9);
        let b = header(1, 1);
        let ts = Tipset::new([a, b.clone()]).unwrap();
        // Ordering is by ticket hash, deterministic for fixed seeds.
        assert_eq!(ts.len(), 2);
        let min = ts.min_ticket_block();
        assert!(ts.block_headers().contains(&b));
        assert_eq!(min, &ts.block_headers()[0]);
    }
}
