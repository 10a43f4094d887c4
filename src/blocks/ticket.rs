// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::tuple::*;

use super::VRFProof;

/// A ticket is a marker of a tick of the blockchain's clock. It is the source
/// of randomness for proofs of storage and leader election.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize_tuple, Deserialize_tuple)]
pub struct Ticket {
    /// A proof output by running a VRF on the VRFResult of the parent ticket.
    pub vrfproof: VRFProof,
}

impl Ticket {
    pub fn new(vrfproof: VRFProof) -> Self {
        Self { vrfproof }
    }
}
