// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod block_validator;

pub use block_validator::{BlockMsgValidator, BlockTopicValidator, BlockValidation};

pub use libp2p::gossipsub::{IdentTopic, MessageAcceptance};
pub use libp2p::PeerId;

use crate::blocks::GossipBlock;

/// `Gossipsub` Filecoin blocks topic identifier.
pub const PUBSUB_BLOCK_STR: &str = "/fil/blocks";
/// `Gossipsub` Filecoin messages topic identifier.
pub const PUBSUB_MSG_STR: &str = "/fil/msgs";

/// The per-network gossip topic blocks are published and validated on,
/// derived deterministically from the network name.
pub fn blocks_topic(network_name: &str) -> IdentTopic {
    IdentTopic::new(format!("{PUBSUB_BLOCK_STR}/{network_name}"))
}

/// Message types that can come over `GossipSub`.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
pub enum PubsubMessage {
    /// Messages that come over the block topic.
    Block(GossipBlock),
}

/// Events emitted toward the chain-sync pipeline.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    PubsubMessage {
        source: PeerId,
        message: PubsubMessage,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_name_is_derived_from_network() {
        assert_eq!(blocks_topic("mainnet").to_string(), "/fil/blocks/mainnet");
        assert_eq!(
            blocks_topic("calibnet").to_string(),
            "/fil/blocks/calibnet"
        );
    }
}
