// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_encoding::tuple::*;

use super::CachingBlockHeader;

/// Block message used as serialized `gossipsub` messages for the blocks
/// topic: the signed header plus the CIDs of the messages it includes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct GossipBlock {
    pub header: CachingBlockHeader,
    pub bls_messages: Vec<Cid>,
    pub secpk_messages: Vec<Cid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::RawBlockHeader;

    #[test]
    fn gossip_block_round_trip() {
        let block = GossipBlock {
            header: CachingBlockHeader::new(RawBlockHeader {
                epoch: 42,
                ..Default::default()
            }),
            bls_messages: vec![],
            secpk_messages: vec![],
        };
        let bytes = fvm_ipld_encoding::to_vec(&block).unwrap();
        let decoded: GossipBlock = fvm_ipld_encoding::from_slice(&bytes).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn truncated_payload_fails_to_decode() {
        let block = GossipBlock {
            header: CachingBlockHeader::default(),
            bls_messages: vec![],
            secpk_messages: vec![],
        };
        let bytes = fvm_ipld_encoding::to_vec(&block).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(fvm_ipld_encoding::from_slice::<GossipBlock>(truncated).is_err());
    }
}
