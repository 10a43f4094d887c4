// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Method names and access levels for the query surface. An outer JSON-RPC
//! transport checks these against the caller's token claims on every
//! request; the mapping itself is the only part this core owns.

use ahash::{HashMap, HashMapExt};
use once_cell::sync::Lazy;

/// Access levels to be checked against JWT claims
pub enum Access {
    Admin,
    Sign,
    Write,
    Read,
}

/// Access mapping between method names and access levels.
/// Checked against JWT claims on every request.
pub static ACCESS_MAP: Lazy<HashMap<&str, Access>> = Lazy::new(|| {
    let mut access = HashMap::new();

    // Chain API
    access.insert(chain_api::CHAIN_HEAD, Access::Read);
    access.insert(chain_api::CHAIN_GET_TIPSET, Access::Read);
    access.insert(chain_api::CHAIN_GET_TIPSET_BY_HEIGHT, Access::Read);
    access.insert(chain_api::CHAIN_NOTIFY, Access::Read);
    // The only mutator on the query surface; gated separately.
    access.insert(chain_api::CHAIN_SET_HEAD, Access::Admin);

    // State API
    access.insert(state_api::STATE_MINER_INFO, Access::Read);
    access.insert(state_api::STATE_MINER_WORKER_ADDRESS, Access::Read);
    access.insert(state_api::STATE_MINER_SECTOR_SIZE, Access::Read);
    access.insert(state_api::STATE_MINER_SECTOR_ALLOCATED, Access::Read);
    access.insert(state_api::STATE_MINER_SECTORS, Access::Read);
    access.insert(state_api::STATE_MINER_ACTIVE_SECTORS, Access::Read);
    access.insert(state_api::STATE_MINER_FAULTS, Access::Read);
    access.insert(state_api::STATE_MINER_RECOVERIES, Access::Read);
    access.insert(state_api::STATE_MINER_PROVING_DEADLINE, Access::Read);
    access.insert(state_api::STATE_MINER_DEADLINES, Access::Read);
    access.insert(state_api::STATE_MINER_PARTITIONS, Access::Read);
    access.insert(state_api::STATE_MINER_POWER, Access::Read);
    access.insert(state_api::STATE_SECTOR_GET_INFO, Access::Read);
    access.insert(state_api::STATE_SECTOR_PRECOMMIT_INFO, Access::Read);
    access.insert(state_api::STATE_SECTOR_PARTITION, Access::Read);
    access.insert(state_api::STATE_MARKET_STORAGE_DEAL, Access::Read);
    access.insert(state_api::STATE_MARKET_DEALS, Access::Read);
    access.insert(
        state_api::STATE_MINER_PRE_COMMIT_DEPOSIT_FOR_POWER,
        Access::Read,
    );
    access.insert(
        state_api::STATE_MINER_INITIAL_PLEDGE_COLLATERAL,
        Access::Read,
    );
    access.insert(state_api::STATE_CIRCULATING_SUPPLY, Access::Read);
    access.insert(
        state_api::STATE_VM_CIRCULATING_SUPPLY_INTERNAL,
        Access::Read,
    );

    access
});

/// Checks an access enumeration against provided JWT claims
pub fn check_access(access: &Access, claims: &[String]) -> bool {
    match access {
        Access::Admin => claims.contains(&"admin".to_owned()),
        Access::Sign => claims.contains(&"sign".to_owned()),
        Access::Write => claims.contains(&"write".to_owned()),
        Access::Read => claims.contains(&"read".to_owned()),
    }
}

/// Chain API
pub mod chain_api {
    pub const CHAIN_HEAD: &str = "Filecoin.ChainHead";
    pub const CHAIN_GET_TIPSET: &str = "Filecoin.ChainGetTipSet";
    pub const CHAIN_GET_TIPSET_BY_HEIGHT: &str = "Filecoin.ChainGetTipSetByHeight";
    pub const CHAIN_NOTIFY: &str = "Filecoin.ChainNotify";
    pub const CHAIN_SET_HEAD: &str = "Filecoin.ChainSetHead";
}

/// State API
pub mod state_api {
    pub const STATE_MINER_INFO: &str = "Filecoin.StateMinerInfo";
    pub const STATE_MINER_WORKER_ADDRESS: &str = "Filecoin.StateMinerWorkerAddress";
    pub const STATE_MINER_SECTOR_SIZE: &str = "Filecoin.StateMinerSectorSize";
    pub const STATE_MINER_SECTOR_ALLOCATED: &str = "Filecoin.StateMinerSectorAllocated";
    pub const STATE_MINER_SECTORS: &str = "Filecoin.StateMinerSectors";
    pub const STATE_MINER_ACTIVE_SECTORS: &str = "Filecoin.StateMinerActiveSectors";
    pub const STATE_MINER_FAULTS: &str = "Filecoin.StateMinerFaults";
    pub const STATE_MINER_RECOVERIES: &str = "Filecoin.StateMinerRecoveries";
    pub const STATE_MINER_PROVING_DEADLINE: &str = "Filecoin.StateMinerProvingDeadline";
    pub const STATE_MINER_DEADLINES: &str = "Filecoin.StateMinerDeadlines";
    pub const STATE_MINER_PARTITIONS: &str = "Filecoin.StateMinerPartitions";
    pub const STATE_MINER_POWER: &str = "Filecoin.StateMinerPower";
    pub const STATE_SECTOR_GET_INFO: &str = "Filecoin.StateSectorGetInfo";
    pub const STATE_SECTOR_PRECOMMIT_INFO: &str = "Filecoin.StateSectorPreCommitInfo";
    pub const STATE_SECTOR_PARTITION: &str = "Filecoin.StateSectorPartition";
    pub const STATE_MARKET_STORAGE_DEAL: &str = "Filecoin.StateMarketStorageDeal";
    pub const STATE_MARKET_DEALS: &str = "Filecoin.StateMarketDeals";
    pub const STATE_MINER_PRE_COMMIT_DEPOSIT_FOR_POWER: &str =
        "Filecoin.StateMinerPreCommitDepositForPower";
    pub const STATE_MINER_INITIAL_PLEDGE_COLLATERAL: &str =
        "Filecoin.StateMinerInitialPledgeCollateral";
    pub const STATE_CIRCULATING_SUPPLY: &str = "Filecoin.StateCirculatingSupply";
    pub const STATE_VM_CIRCULATING_SUPPLY_INTERNAL: &str =
        "Filecoin.StateVMCirculatingSupplyInternal";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_query_is_tagged() {
        // Reads are read-gated; the head reset is the single admin method.
        for (method, access) in ACCESS_MAP.iter() {
            match *method {
                chain_api::CHAIN_SET_HEAD => assert!(matches!(access, Access::Admin)),
                _ => assert!(matches!(access, Access::Read)),
            }
        }
    }

    #[test]
    fn claims_gate_access() {
        let read_only = vec!["read".to_owned()];
        assert!(check_access(&Access::Read, &read_only));
        assert!(!check_access(&Access::Admin, &read_only));

        let admin = vec!["read".to_owned(), "admin".to_owned()];
        assert!(check_access(&Access::Admin, &admin));
    }
}
