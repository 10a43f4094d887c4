// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::Error as EncodingError;
use serde::de::DeserializeOwned;

/// Hash the given bytes with blake2b with a 256-bit digest, the hash used for
/// all content identifiers in the chain store.
pub fn blake2b_256(ingest: &[u8]) -> [u8; 32] {
    let digest = blake2b_simd::Params::new()
        .hash_length(32)
        .to_state()
        .update(ingest)
        .finalize();

    let mut ret = [0u8; 32];
    ret.clone_from_slice(digest.as_bytes());
    ret
}

/// Decode a DAG-CBOR payload, turning any failure into an [`EncodingError`]
/// the caller can downgrade (the gossip path maps it to `Ignore`). Truncated
/// or structurally invalid input never faults the process.
pub fn from_slice_checked<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EncodingError> {
    fvm_ipld_encoding::from_slice(bytes)
}
