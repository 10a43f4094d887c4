// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use cid::multihash::Code;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::DAG_CBOR;
use multihash::MultihashDigest;
use serde::{de::DeserializeOwned, Serialize};

/// CBOR reads and writes over any [`Blockstore`], addressed with the chain's
/// default hash function (blake2b-256).
pub trait CborStoreExt: Blockstore {
    fn default_code() -> Code {
        Code::Blake2b256
    }

    fn put_cbor<S: Serialize>(&self, obj: &S, code: Code) -> anyhow::Result<Cid> {
        let bytes = fvm_ipld_encoding::to_vec(obj)?;
        let cid = Cid::new_v1(DAG_CBOR, code.digest(&bytes));
        self.put_keyed(&cid, &bytes)?;
        Ok(cid)
    }

    fn put_cbor_default<S: Serialize>(&self, obj: &S) -> anyhow::Result<Cid> {
        self.put_cbor(obj, Self::default_code())
    }

    fn get_cbor<T: DeserializeOwned>(&self, cid: &Cid) -> anyhow::Result<Option<T>> {
        match self.get(cid)? {
            Some(bytes) => Ok(Some(fvm_ipld_encoding::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// A variant of [`CborStoreExt::get_cbor`] for objects the store must
    /// contain, with the missing key in the error context.
    fn get_cbor_required<T: DeserializeOwned>(&self, cid: &Cid) -> anyhow::Result<T> {
        self.get_cbor(cid)?
            .with_context(|| format!("object {cid} not found in block store"))
    }
}

impl<T: Blockstore> CborStoreExt for T {}
