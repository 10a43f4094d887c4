// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockWriteGuard};
use prometheus_client::{
    encoding::{EncodeLabelKey, EncodeLabelSet, EncodeLabelValue, LabelSetEncoder},
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

static DEFAULT_REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(Default::default);

/// Process-wide metrics registry, exposed so an outer transport can encode it
/// for scraping.
pub fn default_registry<'a>() -> RwLockWriteGuard<'a, Registry> {
    DEFAULT_REGISTRY.write()
}

pub static LRU_CACHE_HIT: Lazy<Family<KindLabel, Counter>> = Lazy::new(|| {
    let metric = Family::default();
    default_registry().register("lru_cache_hit", "Stats of lru cache hit", metric.clone());
    metric
});

pub static LRU_CACHE_MISS: Lazy<Family<KindLabel, Counter>> = Lazy::new(|| {
    let metric = Family::default();
    default_registry().register("lru_cache_miss", "Stats of lru cache miss", metric.clone());
    metric
});

/// Counter of blocks that fail to decode on the block gossip channel. The
/// gossip validator takes a [`Counter`] at construction; this is the default
/// one registered for the daemon. Tests inject an unregistered counter.
pub static PUBSUB_BLOCK_DECODE_FAILURE: Lazy<Counter> = Lazy::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "pubsub_block_decode_failure",
        "Number of blocks that fail to decode seen on the block gossip channel",
        metric.clone(),
    );
    metric
});

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct KindLabel(&'static str);

impl KindLabel {
    pub const fn new(kind: &'static str) -> Self {
        Self(kind)
    }
}

impl EncodeLabelSet for KindLabel {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        let mut label_encoder = encoder.encode_label();
        let mut label_key_encoder = label_encoder.encode_label_key()?;
        EncodeLabelKey::encode(&"kind", &mut label_key_encoder)?;
        let mut label_value_encoder = label_key_encoder.encode_label_value()?;
        EncodeLabelValue::encode(&self.0, &mut label_value_encoder)?;
        label_value_encoder.finish()
    }
}

pub mod values {
    use super::KindLabel;

    pub const TIPSET: KindLabel = KindLabel::new("tipset");
}
