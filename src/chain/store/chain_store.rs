// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use fvm_ipld_blockstore::Blockstore;
use parking_lot::RwLock;
use tokio::sync::broadcast::{self, Receiver, Sender as Publisher};
use tracing::debug;

use super::index::ChainIndex;
use crate::blocks::{CachingBlockHeader, Tipset, TipsetKey};
use crate::chain::Error;
use crate::networks::ChainConfig;
use crate::utils::db::CborStoreExt as _;

/// A cap on the size of each head-change subscriber's queue. A subscriber
/// that falls further behind than this loses the oldest events
/// (`RecvError::Lagged`); the publisher is never blocked.
pub const SINK_CAP: usize = 200;

/// `Enum` for `pubsub` channel that defines message type variant and data
/// contained in message type.
#[derive(Clone, Debug)]
pub enum HeadChange {
    Apply(Arc<Tipset>),
    Revert(Arc<Tipset>),
}

/// Stores chain data such as the heaviest tipset and cached tipset info at
/// each epoch. This structure is thread-safe, and all caches are wrapped in
/// a mutex to allow a consistent `ChainStore` to be shared across tasks.
pub struct ChainStore<DB> {
    /// Publisher for head change events. Each published item is one batch of
    /// ordered changes applied together.
    publisher: Publisher<Vec<HeadChange>>,

    /// key-value `datastore`.
    pub db: Arc<DB>,

    /// Used as a cache for tipset `lookbacks`.
    pub chain_index: Arc<ChainIndex<Arc<DB>>>,

    /// Parameters of the chain this store follows.
    chain_config: Arc<ChainConfig>,

    genesis_block_header: CachingBlockHeader,

    /// The heaviest locally known tipset. Swapped, never mutated in place.
    heaviest: RwLock<Arc<Tipset>>,
}

impl<DB> ChainStore<DB>
where
    DB: Blockstore,
{
    pub fn new(
        db: Arc<DB>,
        chain_config: Arc<ChainConfig>,
        genesis_block_header: CachingBlockHeader,
    ) -> Result<Self, Error> {
        let (publisher, _) = broadcast::channel(SINK_CAP);
        let chain_index = Arc::new(ChainIndex::new(Arc::clone(&db)));

        db.put_cbor_default(&genesis_block_header)?;
        let heaviest = RwLock::new(Arc::new(Tipset::from(genesis_block_header.clone())));

        Ok(Self {
            publisher,
            chain_index,
            db,
            chain_config,
            genesis_block_header,
            heaviest,
        })
    }

    /// Returns genesis block header.
    pub fn genesis_block_header(&self) -> &CachingBlockHeader {
        &self.genesis_block_header
    }

    pub fn chain_config(&self) -> &Arc<ChainConfig> {
        &self.chain_config
    }

    /// Returns the currently tracked heaviest tipset.
    pub fn heaviest_tipset(&self) -> Arc<Tipset> {
        self.heaviest.read().clone()
    }

    /// Returns key-value store instance.
    pub fn blockstore(&self) -> &DB {
        &self.db
    }

    /// Subscribe to head changes. The receiver sees only events published
    /// after this call; there is no replay of history.
    pub fn subscribe(&self) -> Receiver<Vec<HeadChange>> {
        self.publisher.subscribe()
    }

    /// Returns a reference to the publisher of head changes.
    pub fn publisher(&self) -> &Publisher<Vec<HeadChange>> {
        &self.publisher
    }

    /// Returns the tipset for the provided key, or the current heaviest
    /// tipset for the empty "use head" sentinel. The head is read once, at
    /// call time.
    pub fn tipset_from_keys(&self, tsk: &TipsetKey) -> Result<Arc<Tipset>, Error> {
        if tsk.is_empty() {
            return Ok(self.heaviest_tipset());
        }
        self.chain_index.load_tipset(tsk)
    }

    /// Sets the heaviest tipset, persisting its headers and publishing an
    /// `Apply` batch. Called by chain-sync when a new frontier is finalized
    /// locally.
    pub fn set_heaviest_tipset(&self, ts: Arc<Tipset>) -> Result<(), Error> {
        for header in ts.block_headers() {
            self.db.put_cbor_default(header)?;
        }
        *self.heaviest.write() = ts.clone();
        if self.publisher.send(vec![HeadChange::Apply(ts)]).is_err() {
            debug!("did not publish head change, no active receivers");
        }
        Ok(())
    }

    /// Forcibly resets the head to the given tipset, publishing the revert
    /// of the old head together with the apply of the new one as a single
    /// ordered batch. This is the admin-gated mutator behind
    /// `Filecoin.ChainSetHead`.
    pub fn reset_head(&self, ts: Arc<Tipset>) -> Result<(), Error> {
        for header in ts.block_headers() {
            self.db.put_cbor_default(header)?;
        }
        let previous = {
            let mut head = self.heaviest.write();
            let previous = head.clone();
            *head = ts.clone();
            previous
        };
        let batch = vec![HeadChange::Revert(previous), HeadChange::Apply(ts)];
        if self.publisher.send(batch).is_err() {
            debug!("did not publish head change, no active receivers");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{RawBlockHeader, Ticket, VRFProof};
    use crate::db::MemoryDB;
    use fvm_shared::clock::ChainEpoch;
    use tokio::sync::broadcast::error::TryRecvError;

    fn chain_store() -> ChainStore<MemoryDB> {
        ChainStore::new(
            Arc::new(MemoryDB::default()),
            Arc::new(ChainConfig::devnet()),
            CachingBlockHeader::default(),
        )
        .unwrap()
    }

    fn tipset_child(parent: &Tipset, epoch: ChainEpoch, seed: u8) -> Arc<Tipset> {
        Arc::new(Tipset::from(RawBlockHeader {
            parents: parent.key().clone(),
            epoch,
            ticket: Some(Ticket::new(VRFProof::new(vec![seed; 4]))),
            ..Default::default()
        }))
    }

    #[test]
    fn genesis_is_initial_head() {
        let cs = chain_store();
        assert_eq!(cs.heaviest_tipset().epoch(), 0);
        assert_eq!(
            cs.genesis_block_header().cid(),
            cs.heaviest_tipset().min_ticket_block().cid()
        );
    }

    #[test]
    fn empty_key_resolves_head_at_call_time() {
        let cs = chain_store();
        let genesis = cs.heaviest_tipset();
        assert_eq!(
            cs.tipset_from_keys(&TipsetKey::default()).unwrap(),
            genesis
        );

        let child = tipset_child(&genesis, 1, 1);
        cs.set_heaviest_tipset(child.clone()).unwrap();
        // The sentinel tracks the new head, not the head at store creation.
        assert_eq!(cs.tipset_from_keys(&TipsetKey::default()).unwrap(), child);
    }

    #[test]
    fn tipset_from_keys_is_not_found_outside_range() {
        let cs = chain_store();
        let other = Tipset::from(RawBlockHeader {
            epoch: 9,
            ..Default::default()
        });
        assert!(matches!(
            cs.tipset_from_keys(other.key()),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn subscribers_see_batches_in_apply_order() {
        let cs = chain_store();
        let genesis = cs.heaviest_tipset();

        // Events published before subscription are not replayed.
        let pre = tipset_child(&genesis, 1, 1);
        cs.set_heaviest_tipset(pre.clone()).unwrap();

        let mut rx = cs.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        let a = tipset_child(&pre, 2, 2);
        let b = tipset_child(&a, 3, 3);
        cs.set_heaviest_tipset(a.clone()).unwrap();
        cs.set_heaviest_tipset(b.clone()).unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(&first[..], [HeadChange::Apply(ts)] if ts == &a));
        assert!(matches!(&second[..], [HeadChange::Apply(ts)] if ts == &b));
    }

    #[tokio::test]
    async fn reset_head_reverts_then_applies() {
        let cs = chain_store();
        let genesis = cs.heaviest_tipset();
        let a = tipset_child(&genesis, 1, 1);
        cs.set_heaviest_tipset(a.clone()).unwrap();

        let mut rx = cs.subscribe();
        cs.reset_head(genesis.clone()).unwrap();

        let batch = rx.recv().await.unwrap();
        assert!(matches!(
            &batch[..],
            [HeadChange::Revert(old), HeadChange::Apply(new)]
                if old == &a && new == &genesis
        ));
        assert_eq!(cs.heaviest_tipset(), genesis);
    }

    #[tokio::test]
    async fn slow_subscribers_drop_oldest_without_blocking_publisher() {
        let cs = chain_store();
        let mut parent = cs.heaviest_tipset();
        let mut rx = cs.subscribe();

        for i in 0..(SINK_CAP as u64 + 10) {
            let child = tipset_child(&parent, (i + 1) as ChainEpoch, (i % 250) as u8);
            cs.set_heaviest_tipset(child.clone()).unwrap();
            parent = child;
        }

        // The oldest events were dropped; reception resumes with the lag
        // error and then the still-buffered events, in order.
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(missed)) => assert!(missed >= 10),
            other => panic!("expected lag, got {other:?}"),
        }
        let next = rx.recv().await.unwrap();
        assert!(matches!(&next[..], [HeadChange::Apply(_)]));
    }
}
