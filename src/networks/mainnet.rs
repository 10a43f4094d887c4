// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use once_cell::sync::Lazy;

use super::{Height, HeightInfo};

/// Upgrade epochs for the supported schema generations on mainnet.
pub static HEIGHT_INFOS: Lazy<[HeightInfo; 2]> = Lazy::new(|| {
    [
        HeightInfo {
            height: Height::Skyr,
            epoch: 1_960_320,
        },
        HeightInfo {
            height: Height::Shark,
            epoch: 2_383_680,
        },
    ]
});
