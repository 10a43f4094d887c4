// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::tuple::*;

use super::VRFProof;

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize_tuple, Deserialize_tuple)]
pub struct ElectionProof {
    /// Number of reward units won in this round.
    pub win_count: i64,
    /// A proof output by running a VRF on the election randomness.
    pub vrfproof: VRFProof,
}
