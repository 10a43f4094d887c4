// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{fmt::Display, str::FromStr};

use fvm_shared::clock::{ChainEpoch, EPOCH_DURATION_SECONDS};
use fvm_shared::version::NetworkVersion;
use serde::{Deserialize, Serialize};

use crate::actors::policy::Policy;

mod mainnet;

/// Builtin network chains. In general only `mainnet` and its chain
/// information should be considered stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum NetworkChain {
    Mainnet,
    Calibnet,
    Devnet(String),
}

impl FromStr for NetworkChain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(NetworkChain::Mainnet),
            "calibnet" => Ok(NetworkChain::Calibnet),
            name => Ok(NetworkChain::Devnet(name.to_owned())),
        }
    }
}

impl Display for NetworkChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkChain::Mainnet => write!(f, "mainnet"),
            NetworkChain::Calibnet => write!(f, "calibnet"),
            NetworkChain::Devnet(name) => write!(f, "{name}"),
        }
    }
}

/// Defines the meaningful heights of the protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Height {
    Skyr,
    Shark,
}

impl From<Height> for NetworkVersion {
    fn from(height: Height) -> NetworkVersion {
        match height {
            Height::Skyr => NetworkVersion::V16,
            Height::Shark => NetworkVersion::V17,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct HeightInfo {
    pub height: Height,
    pub epoch: ChainEpoch,
}

fn sort_by_epoch(height_info_slice: &[HeightInfo]) -> Vec<HeightInfo> {
    let mut height_info_vec = height_info_slice.to_vec();
    height_info_vec.sort_by(|a, b| a.epoch.cmp(&b.epoch));
    height_info_vec
}

/// Defines all network configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub network: NetworkChain,
    pub block_delay_secs: u32,
    pub propagation_delay_secs: u32,
    pub height_infos: Vec<HeightInfo>,
    pub policy: Policy,
}

impl ChainConfig {
    pub fn mainnet() -> Self {
        Self {
            network: NetworkChain::Mainnet,
            block_delay_secs: EPOCH_DURATION_SECONDS as u32,
            propagation_delay_secs: 10,
            height_infos: mainnet::HEIGHT_INFOS.to_vec(),
            policy: Policy::mainnet(),
        }
    }

    pub fn devnet() -> Self {
        Self {
            network: NetworkChain::Devnet("devnet".to_string()),
            block_delay_secs: 4,
            propagation_delay_secs: 1,
            // Devnets run the newest schema from genesis.
            height_infos: vec![
                HeightInfo {
                    height: Height::Skyr,
                    epoch: -1,
                },
                HeightInfo {
                    height: Height::Shark,
                    epoch: -1,
                },
            ],
            policy: Policy::mainnet(),
        }
    }

    /// Returns the network version in force at the given epoch. The same
    /// epoch always yields the same version; this drives actor schema
    /// selection. Epochs before the oldest supported upgrade report the
    /// oldest supported version.
    pub fn network_version(&self, epoch: ChainEpoch) -> NetworkVersion {
        sort_by_epoch(&self.height_infos)
            .iter()
            .rev()
            .find(|info| epoch > info.epoch)
            .map(|info| info.height.into())
            .unwrap_or(NetworkVersion::V16)
    }

    pub fn network_name(&self) -> String {
        self.network.to_string()
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig::mainnet()
    }
}
