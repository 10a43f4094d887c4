// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{num::NonZeroUsize, sync::Arc};

use fvm_ipld_blockstore::Blockstore;
use fvm_shared::clock::ChainEpoch;
use lru::LruCache;
use nonzero_ext::nonzero;
use parking_lot::Mutex;

use crate::blocks::{Tipset, TipsetKey};
use crate::chain::Error;
use crate::metrics;

const DEFAULT_TIPSET_CACHE_SIZE: NonZeroUsize = nonzero!(8192usize);

type TipsetCache = Mutex<LruCache<TipsetKey, Arc<Tipset>>>;

/// Caches tipsets by key and resolves height-based look-backs along a chain
/// of ancestors.
pub struct ChainIndex<DB> {
    /// Tipset cache
    ts_cache: TipsetCache,

    /// `Blockstore` pointer needed to load tipsets from cold storage.
    db: DB,
}

/// Methods for resolving fetches of null tipsets.
/// Imagine epoch 10 is null but epoch 9 and 11 exist. If we request epoch 10,
/// should 9 or 11 be returned?
#[derive(Debug, Clone, Copy)]
pub enum ResolveNullTipset {
    TakeNewer,
    TakeOlder,
}

impl<DB: Blockstore> ChainIndex<DB> {
    pub fn new(db: DB) -> Self {
        let ts_cache = Mutex::new(LruCache::new(DEFAULT_TIPSET_CACHE_SIZE));
        Self { ts_cache, db }
    }

    pub fn db(&self) -> &DB {
        &self.db
    }

    /// Loads a tipset from memory given the tipset keys and cache.
    /// Semantically identical to [`Tipset::load`] but the result is cached.
    /// [`Error::NotFound`] when the key names blocks outside the locally held
    /// range.
    pub fn load_tipset(&self, tsk: &TipsetKey) -> Result<Arc<Tipset>, Error> {
        if let Some(ts) = self.ts_cache.lock().get(tsk) {
            metrics::LRU_CACHE_HIT
                .get_or_create(&metrics::values::TIPSET)
                .inc();
            return Ok(ts.clone());
        }

        let ts = Arc::new(
            Tipset::load(&self.db, tsk)?
                .ok_or_else(|| Error::NotFound(format!("tipset {tsk}")))?,
        );
        self.ts_cache.lock().put(tsk.clone(), ts.clone());
        metrics::LRU_CACHE_MISS
            .get_or_create(&metrics::values::TIPSET)
            .inc();
        Ok(ts)
    }

    /// Find tipset at epoch `to` in the chain of ancestors starting at
    /// `from`. If the `to` epoch is higher than `from.epoch()`, an error is
    /// returned: the resolution never walks toward descendants, and always
    /// stays on `from`'s branch.
    ///
    /// # Why pass in the `from` argument?
    ///
    /// The chain may fork, making "the tipset at epoch 2" ambiguous. The
    /// ambiguity is solved by passing in a younger anchor tipset from which
    /// the desired tipset is an ancestor: resolving epoch 2 through anchor
    /// `3A` yields `2A`, through anchor `3B` yields `2B`.
    ///
    /// # What happens when a null tipset is requested?
    ///
    /// If the requested epoch is a null round (no tipset was produced), there
    /// are two options: pick the nearest older tipset or the nearest younger
    /// tipset, selected by [`ResolveNullTipset`].
    pub fn tipset_by_height(
        &self,
        to: ChainEpoch,
        from: Arc<Tipset>,
        resolve: ResolveNullTipset,
    ) -> Result<Arc<Tipset>, Error> {
        if to > from.epoch() {
            return Err(Error::Other(
                "Looking for tipset with height greater than start point".to_string(),
            ));
        }

        let mut chain = self.chain(from);
        let mut child = chain.next().expect("chain iterator yields its start");
        if to == child.epoch() {
            return Ok(child);
        }

        for parent in chain {
            if to == parent.epoch() {
                return Ok(parent);
            }
            if to > parent.epoch() {
                // child.epoch() > to > parent.epoch(): `to` is a null round.
                return match resolve {
                    ResolveNullTipset::TakeOlder => Ok(parent),
                    ResolveNullTipset::TakeNewer => Ok(child),
                };
            }
            child = parent;
        }
        Err(Error::NotFound(format!(
            "tipset with epoch={to} on this branch"
        )))
    }

    /// Iterate from the given tipset to genesis. Missing tipsets cut the
    /// chain short.
    pub fn chain(&self, from: Arc<Tipset>) -> impl Iterator<Item = Arc<Tipset>> + '_ {
        std::iter::successors(Some(from), move |tipset| {
            if tipset.parents().is_empty() {
                None
            } else {
                self.load_tipset(tipset.parents()).ok()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{CachingBlockHeader, RawBlockHeader, Ticket, VRFProof};
    use crate::db::MemoryDB;
    use crate::utils::db::CborStoreExt;

    fn persist_tipset(tipset: &Tipset, db: &impl Blockstore) {
        for block in tipset.block_headers() {
            db.put_cbor_default(block).unwrap();
        }
    }

    fn genesis_tipset() -> Tipset {
        Tipset::from(RawBlockHeader::default())
    }

    fn tipset_child(parent: &Tipset, epoch: ChainEpoch, seed: u8) -> Tipset {
        Tipset::from(CachingBlockHeader::new(RawBlockHeader {
            parents: parent.key().clone(),
            epoch,
            ticket: Some(Ticket::new(VRFProof::new(vec![seed; 4]))),
            ..Default::default()
        }))
    }

    #[test]
    fn get_null_tipset() {
        let db = Arc::new(MemoryDB::default());
        let gen = genesis_tipset();
        let epoch1 = tipset_child(&gen, 1, 1);
        let epoch3 = tipset_child(&epoch1, 3, 3);
        let epoch4 = tipset_child(&epoch3, 4, 4);
        persist_tipset(&gen, &db);
        persist_tipset(&epoch1, &db);
        persist_tipset(&epoch3, &db);
        persist_tipset(&epoch4, &db);

        let index = ChainIndex::new(db);
        // epoch 2 is null. ResolveNullTipset decides whether to return epoch
        // 1 or epoch 3.
        assert_eq!(
            index
                .tipset_by_height(2, Arc::new(epoch4.clone()), ResolveNullTipset::TakeOlder)
                .unwrap()
                .as_ref(),
            &epoch1
        );

        assert_eq!(
            index
                .tipset_by_height(2, Arc::new(epoch4), ResolveNullTipset::TakeNewer)
                .unwrap()
                .as_ref(),
            &epoch3
        );

        // The resolved ancestor is the same tipset a direct query for its
        // height returns.
        let direct = index
            .tipset_by_height(1, Arc::new(epoch3), ResolveNullTipset::TakeOlder)
            .unwrap();
        assert_eq!(direct.as_ref(), &epoch1);
    }

    #[test]
    fn get_different_branches() {
        let db = Arc::new(MemoryDB::default());
        let gen = genesis_tipset();
        let epoch1 = tipset_child(&gen, 1, 1);

        let epoch2a = tipset_child(&epoch1, 2, 21);
        let epoch3a = tipset_child(&epoch2a, 3, 31);

        let epoch2b = tipset_child(&epoch1, 2, 22);
        let epoch3b = tipset_child(&epoch2b, 3, 32);

        for ts in [&gen, &epoch1, &epoch2a, &epoch3a, &epoch2b, &epoch3b] {
            persist_tipset(ts, &db);
        }

        let index = ChainIndex::new(db);
        // The chain has forked; epochs 2 and 3 are ambiguous without an
        // anchor.
        assert_eq!(
            index
                .tipset_by_height(2, Arc::new(epoch3a), ResolveNullTipset::TakeOlder)
                .unwrap()
                .as_ref(),
            &epoch2a
        );

        assert_eq!(
            index
                .tipset_by_height(2, Arc::new(epoch3b), ResolveNullTipset::TakeOlder)
                .unwrap()
                .as_ref(),
            &epoch2b
        );
    }

    #[test]
    fn height_above_anchor_is_an_error() {
        let db = Arc::new(MemoryDB::default());
        let gen = genesis_tipset();
        persist_tipset(&gen, &db);
        let index = ChainIndex::new(db);
        assert!(index
            .tipset_by_height(5, Arc::new(gen), ResolveNullTipset::TakeOlder)
            .is_err());
    }

    #[test]
    fn resolves_genesis_at_height_zero() {
        let db = Arc::new(MemoryDB::default());
        let gen = genesis_tipset();
        let epoch2 = tipset_child(&gen, 2, 2);
        persist_tipset(&gen, &db);
        persist_tipset(&epoch2, &db);

        let index = ChainIndex::new(db);
        assert_eq!(
            index
                .tipset_by_height(0, Arc::new(epoch2), ResolveNullTipset::TakeOlder)
                .unwrap()
                .as_ref(),
            &gen
        );
    }
}
