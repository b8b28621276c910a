// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-chain validator committee. The committee is owned by governance and
//! read-only to the verifier; the engine swaps whole committee snapshots so
//! changes take effect for the next verification, never retroactively.

use crate::crypto::ValidatorPublicKeyBytes;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitteeError {
    #[error("duplicate validator public key in committee")]
    DuplicateMember,
    #[error("committee quorum threshold must be at least 1")]
    ZeroQuorumThreshold,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMember {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: ValidatorPublicKeyBytes,
    /// Operator-facing label, used in logs only.
    pub name: String,
    /// Blocklisted members stay registered for audit purposes but their
    /// signatures no longer count towards quorum.
    pub is_blocklisted: bool,
}

impl CommitteeMember {
    pub fn new(public_key: ValidatorPublicKeyBytes, name: impl Into<String>) -> Self {
        Self {
            public_key,
            name: name.into(),
            is_blocklisted: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCommittee {
    members: BTreeMap<ValidatorPublicKeyBytes, CommitteeMember>,
    min_validators: u16,
}

impl ValidatorCommittee {
    pub fn new(
        members: Vec<CommitteeMember>,
        min_validators: u16,
    ) -> Result<Self, CommitteeError> {
        if min_validators == 0 {
            return Err(CommitteeError::ZeroQuorumThreshold);
        }
        let mut map = BTreeMap::new();
        for member in members {
            if map.insert(member.public_key, member).is_some() {
                return Err(CommitteeError::DuplicateMember);
            }
        }
        Ok(Self {
            members: map,
            min_validators,
        })
    }

    pub fn members(&self) -> &BTreeMap<ValidatorPublicKeyBytes, CommitteeMember> {
        &self.members
    }

    pub fn member(&self, key: &ValidatorPublicKeyBytes) -> Option<&CommitteeMember> {
        self.members.get(key)
    }

    /// Members whose signatures can count towards quorum.
    pub fn active_member_count(&self) -> usize {
        self.members.values().filter(|m| !m.is_blocklisted).count()
    }

    pub fn is_active_member(&self, key: &ValidatorPublicKeyBytes) -> bool {
        self.members
            .get(key)
            .map(|m| !m.is_blocklisted)
            .unwrap_or(false)
    }

    pub fn min_validators(&self) -> u16 {
        self.min_validators
    }

    /// Fail-closed quorum rule: distinct valid signers must meet the
    /// threshold. A threshold above the active member count is expressible
    /// (governance may blocklist below it) and then nothing verifies.
    pub fn quorum_reached(&self, distinct_valid_signers: usize) -> bool {
        distinct_valid_signers >= self.min_validators as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ValidatorKeyPair;

    fn member(seed: u8) -> CommitteeMember {
        let kp = ValidatorKeyPair::from_bytes(&[seed; 32]);
        CommitteeMember::new(kp.public_key_bytes(), format!("validator-{seed}"))
    }

    #[test]
    fn test_rejects_zero_threshold() {
        assert_eq!(
            ValidatorCommittee::new(vec![member(1)], 0).unwrap_err(),
            CommitteeError::ZeroQuorumThreshold
        );
    }

    #[test]
    fn test_rejects_duplicate_member() {
        assert_eq!(
            ValidatorCommittee::new(vec![member(1), member(1)], 1).unwrap_err(),
            CommitteeError::DuplicateMember
        );
    }

    #[test]
    fn test_blocklisted_member_not_active() {
        let mut blocked = member(1);
        blocked.is_blocklisted = true;
        let key = blocked.public_key;
        let committee = ValidatorCommittee::new(vec![blocked, member(2)], 1).unwrap();
        assert_eq!(committee.active_member_count(), 1);
        assert!(!committee.is_active_member(&key));
    }

    #[test]
    fn test_quorum_threshold() {
        let committee =
            ValidatorCommittee::new(vec![member(1), member(2), member(3)], 2).unwrap();
        assert!(!committee.quorum_reached(1));
        assert!(committee.quorum_reached(2));
        assert!(committee.quorum_reached(3));
    }
}
