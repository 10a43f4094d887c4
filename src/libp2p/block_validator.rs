// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flume::Sender;
use libp2p::gossipsub::MessageAcceptance;
use libp2p::PeerId;
use prometheus_client::metrics::counter::Counter;
use tracing::{debug, warn};

use super::{NetworkEvent, PubsubMessage};
use crate::blocks::GossipBlock;
use crate::utils::encoding::from_slice_checked;

/// How long one inbound block may spend in consensus validation before the
/// gateway gives up on it. Stalling here would back-pressure the whole
/// gossip pipeline, so an overdue verdict degrades to `Ignore`.
const VALIDATE_BLOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// The consensus rules applied to a decoded block: signature, timestamp,
/// ticket and power eligibility. Injected by the node; not part of this
/// admission layer.
#[async_trait]
pub trait BlockMsgValidator: Send + Sync {
    async fn validate_block_msg(&self, block: &GossipBlock) -> MessageAcceptance;
}

/// The admission verdict for one gossiped block message. On acceptance the
/// decoded block travels with the verdict, so downstream consumers never
/// re-decode the payload.
#[derive(Debug)]
pub enum BlockValidation {
    Accept(Box<GossipBlock>),
    Reject,
    Ignore,
}

impl BlockValidation {
    /// The verdict to report to the gossipsub router.
    pub fn acceptance(&self) -> MessageAcceptance {
        match self {
            BlockValidation::Accept(_) => MessageAcceptance::Accept,
            BlockValidation::Reject => MessageAcceptance::Reject,
            BlockValidation::Ignore => MessageAcceptance::Ignore,
        }
    }
}

/// Validates inbound messages on the per-network blocks topic before they
/// may influence local chain state.
///
/// The validator holds no mutable state beyond the shared decode-failure
/// counter; it may be invoked concurrently and repeatedly with no ordering
/// dependency between calls.
pub struct BlockTopicValidator<V> {
    validator: Arc<V>,
    /// Counts payloads that fail to decode. Injected so the process-wide
    /// registry stays out of this layer; tests pass an unregistered counter.
    decode_failures: Counter,
}

impl<V> BlockTopicValidator<V>
where
    V: BlockMsgValidator,
{
    pub fn new(validator: Arc<V>, decode_failures: Counter) -> Self {
        Self {
            validator,
            decode_failures,
        }
    }

    /// Decodes and validates one gossiped block message.
    ///
    /// A payload that does not decode is noise, not proof of misbehaviour:
    /// no signature has been checked yet, so the message is ignored rather
    /// than rejected, and the decode-failure counter ticks exactly once.
    /// A well-formed payload is judged by the injected consensus capability,
    /// whose verdict is passed through unaltered; a verdict that does not
    /// arrive within [`VALIDATE_BLOCK_TIMEOUT`] degrades to `Ignore`.
    pub async fn validate(&self, source: PeerId, data: &[u8]) -> BlockValidation {
        let block: GossipBlock = match from_slice_checked(data) {
            Ok(block) => block,
            Err(e) => {
                warn!("failed to decode blocksub payload from peer {source}: {e}");
                self.decode_failures.inc();
                return BlockValidation::Ignore;
            }
        };

        let verdict = tokio::time::timeout(
            VALIDATE_BLOCK_TIMEOUT,
            self.validator.validate_block_msg(&block),
        )
        .await;

        match verdict {
            Ok(MessageAcceptance::Accept) => BlockValidation::Accept(Box::new(block)),
            Ok(MessageAcceptance::Reject) => BlockValidation::Reject,
            Ok(MessageAcceptance::Ignore) => BlockValidation::Ignore,
            Err(_) => {
                debug!("block validation from peer {source} timed out, ignoring");
                BlockValidation::Ignore
            }
        }
    }

    /// Validates a message and forwards an accepted block to the chain-sync
    /// pipeline, returning the verdict for the gossipsub router.
    pub async fn validate_and_emit(
        &self,
        source: PeerId,
        data: &[u8],
        network_sender_out: &Sender<NetworkEvent>,
    ) -> MessageAcceptance {
        let validation = self.validate(source, data).await;
        let acceptance = validation.acceptance();
        if let BlockValidation::Accept(block) = validation {
            if network_sender_out
                .send_async(NetworkEvent::PubsubMessage {
                    source,
                    message: PubsubMessage::Block(*block),
                })
                .await
                .is_err()
            {
                warn!("failed to emit validated block: receiver has been dropped");
            }
        }
        acceptance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{CachingBlockHeader, RawBlockHeader};

    struct FixedVerdict(MessageAcceptance);

    #[async_trait]
    impl BlockMsgValidator for FixedVerdict {
        async fn validate_block_msg(&self, _block: &GossipBlock) -> MessageAcceptance {
            match self.0 {
                MessageAcceptance::Accept => MessageAcceptance::Accept,
                MessageAcceptance::Reject => MessageAcceptance::Reject,
                MessageAcceptance::Ignore => MessageAcceptance::Ignore,
            }
        }
    }

    struct NeverReturns;

    #[async_trait]
    impl BlockMsgValidator for NeverReturns {
        async fn validate_block_msg(&self, _block: &GossipBlock) -> MessageAcceptance {
            std::future::pending().await
        }
    }

    fn well_formed_block() -> Vec<u8> {
        let block = GossipBlock {
            header: CachingBlockHeader::new(RawBlockHeader {
                epoch: 1,
                ..Default::default()
            }),
            bls_messages: vec![],
            secpk_messages: vec![],
        };
        fvm_ipld_encoding::to_vec(&block).unwrap()
    }

    #[tokio::test]
    async fn truncated_payload_is_ignored_and_counted_once() {
        let counter = Counter::default();
        let validator = BlockTopicValidator::new(
            Arc::new(FixedVerdict(MessageAcceptance::Accept)),
            counter.clone(),
        );

        let bytes = well_formed_block();
        let truncated = &bytes[..bytes.len() - 3];

        let verdict = validator.validate(PeerId::random(), truncated).await;
        assert!(matches!(verdict, BlockValidation::Ignore));
        assert_eq!(counter.get(), 1);

        // No payload is attached on the ignore path.
        assert!(matches!(
            verdict.acceptance(),
            MessageAcceptance::Ignore
        ));
    }

    #[tokio::test]
    async fn consensus_verdict_passes_through_unaltered() {
        let counter = Counter::default();
        let bytes = well_formed_block();

        let accepting = BlockTopicValidator::new(
            Arc::new(FixedVerdict(MessageAcceptance::Accept)),
            counter.clone(),
        );
        match accepting.validate(PeerId::random(), &bytes).await {
            BlockValidation::Accept(block) => assert_eq!(block.header.epoch, 1),
            other => panic!("expected accept, got {other:?}"),
        }

        let rejecting = BlockTopicValidator::new(
            Arc::new(FixedVerdict(MessageAcceptance::Reject)),
            counter.clone(),
        );
        assert!(matches!(
            rejecting.validate(PeerId::random(), &bytes).await,
            BlockValidation::Reject
        ));

        let ignoring = BlockTopicValidator::new(
            Arc::new(FixedVerdict(MessageAcceptance::Ignore)),
            counter.clone(),
        );
        assert!(matches!(
            ignoring.validate(PeerId::random(), &bytes).await,
            BlockValidation::Ignore
        ));

        // Well-formed payloads never tick the decode-failure counter.
        assert_eq!(counter.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_consensus_validation_degrades_to_ignore() {
        let validator =
            BlockTopicValidator::new(Arc::new(NeverReturns), Counter::default());
        let bytes = well_formed_block();

        // With the clock paused, the timeout fires deterministically.
        let verdict = validator.validate(PeerId::random(), &bytes).await;
        assert!(matches!(verdict, BlockValidation::Ignore));
    }

    #[tokio::test]
    async fn accepted_blocks_are_emitted_downstream() {
        let counter = Counter::default();
        let validator = BlockTopicValidator::new(
            Arc::new(FixedVerdict(MessageAcceptance::Accept)),
            counter,
        );
        let (tx, rx) = flume::unbounded();
        let bytes = well_formed_block();

        let acceptance = validator
            .validate_and_emit(PeerId::random(), &bytes, &tx)
            .await;
        assert!(matches!(acceptance, MessageAcceptance::Accept));

        let NetworkEvent::PubsubMessage { message, .. } = rx.recv_async().await.unwrap();
        let PubsubMessage::Block(block) = message;
        assert_eq!(block.header.epoch, 1);
    }

    #[tokio::test]
    async fn rejected_blocks_are_not_emitted() {
        let validator = BlockTopicValidator::new(
            Arc::new(FixedVerdict(MessageAcceptance::Reject)),
            Counter::default(),
        );
        let (tx, rx) = flume::unbounded();
        let bytes = well_formed_block();

        let acceptance = validator
            .validate_and_emit(PeerId::random(), &bytes, &tx)
            .await;
        assert!(matches!(acceptance, MessageAcceptance::Reject));
        assert!(rx.is_empty());
    }
}
