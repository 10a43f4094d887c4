// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::HashMap;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use parking_lot::RwLock;

/// A thread-safe `HashMap` implementation of the [`Blockstore`] trait. Used by
/// tests and light tooling; production deployments wire in an on-disk
/// content-addressed store behind the same trait.
#[derive(Debug, Default)]
pub struct MemoryDB {
    blockchain_db: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl Blockstore for MemoryDB {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.blockchain_db.read().get(k).cloned())
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.blockchain_db.write().insert(*k, block.to_vec());
        Ok(())
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        Ok(self.blockchain_db.read().contains_key(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::db::CborStoreExt;

    #[test]
    fn basic_put_get() {
        let db = MemoryDB::default();
        let cid = db.put_cbor_default(&"value".to_string()).unwrap();
        assert!(db.has(&cid).unwrap());
        assert_eq!(
            db.get_cbor::<String>(&cid).unwrap().as_deref(),
            Some("value")
        );
    }
}
