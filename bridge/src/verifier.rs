// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Quorum verification of validator attestations. Committees are published
//! as immutable snapshots behind an `ArcSwap`; a governance change to the
//! validator set applies to the next verification, never to one in flight.

use crate::error::{BridgeError, BridgeResult};
use arc_swap::ArcSwap;
use relay_bridge_types::{ChainId, ValidatorCommittee, ValidatorSignInfo};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SignatureVerifier {
    committees: ArcSwap<BTreeMap<ChainId, Arc<ValidatorCommittee>>>,
}

impl SignatureVerifier {
    pub fn new(committees: BTreeMap<ChainId, ValidatorCommittee>) -> Self {
        let committees = committees
            .into_iter()
            .map(|(chain, committee)| (chain, Arc::new(committee)))
            .collect();
        Self {
            committees: ArcSwap::from_pointee(committees),
        }
    }

    pub fn committee(&self, chain: ChainId) -> Option<Arc<ValidatorCommittee>> {
        self.committees.load().get(&chain).cloned()
    }

    /// Install a new committee snapshot for `chain`. In-flight verifications
    /// keep the snapshot they loaded.
    pub fn replace_committee(&self, chain: ChainId, committee: ValidatorCommittee) {
        let mut next = (**self.committees.load()).clone();
        next.insert(chain, Arc::new(committee));
        self.committees.store(Arc::new(next));
    }

    /// Check that `signatures` form a valid quorum over `payload_hash` for
    /// the committee registered for `chain`.
    ///
    /// Invalid, malformed, or unregistered signatures are discarded rather
    /// than treated as fatal: an attacker can always append garbage to an
    /// otherwise valid proof. Duplicate signatures from one validator count
    /// once. Fails closed when no committee is registered or the threshold
    /// is unreachable.
    pub fn verify_quorum(
        &self,
        chain: ChainId,
        payload_hash: &[u8; 32],
        signatures: &[ValidatorSignInfo],
    ) -> BridgeResult<()> {
        let committee = self
            .committee(chain)
            .ok_or(BridgeError::UnknownChain(chain))?;

        let mut distinct_signers: BTreeSet<_> = BTreeSet::new();
        for sig_info in signatures {
            if !committee.is_active_member(&sig_info.validator) {
                debug!(
                    validator = %hex::encode(sig_info.validator),
                    %chain,
                    "discarding signature from unregistered or blocklisted validator"
                );
                continue;
            }
            if !sig_info.verify(payload_hash) {
                warn!(
                    validator = %hex::encode(sig_info.validator),
                    %chain,
                    "discarding cryptographically invalid signature"
                );
                continue;
            }
            distinct_signers.insert(sig_info.validator);
        }

        if !committee.quorum_reached(distinct_signers.len()) {
            return Err(BridgeError::UnauthorizedProof(format!(
                "{} distinct valid validator signatures, quorum requires {}",
                distinct_signers.len(),
                committee.min_validators()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_bridge_types::{CommitteeMember, ValidatorKeyPair};

    fn setup(
        num_validators: usize,
        min_validators: u16,
    ) -> (SignatureVerifier, Vec<ValidatorKeyPair>) {
        let keys: Vec<_> = (0..num_validators)
            .map(|i| ValidatorKeyPair::from_bytes(&[i as u8 + 1; 32]))
            .collect();
        let members = keys
            .iter()
            .enumerate()
            .map(|(i, kp)| CommitteeMember::new(kp.public_key_bytes(), format!("validator-{i}")))
            .collect();
        let committee = ValidatorCommittee::new(members, min_validators).unwrap();
        let verifier = SignatureVerifier::new(BTreeMap::from([(ChainId(1), committee)]));
        (verifier, keys)
    }

    #[test]
    fn test_quorum_met() {
        let (verifier, keys) = setup(4, 3);
        let hash = [9u8; 32];
        let sigs: Vec<_> = keys[..3].iter().map(|k| k.sign(&hash)).collect();
        verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap();
    }

    #[test]
    fn test_quorum_monotonic_under_superset() {
        let (verifier, keys) = setup(4, 3);
        let hash = [9u8; 32];
        // All four signatures: superset of a quorum still verifies.
        let sigs: Vec<_> = keys.iter().map(|k| k.sign(&hash)).collect();
        verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap();
    }

    #[test]
    fn test_one_short_of_quorum_fails() {
        let (verifier, keys) = setup(4, 3);
        let hash = [9u8; 32];
        let sigs: Vec<_> = keys[..2].iter().map(|k| k.sign(&hash)).collect();
        let err = verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap_err();
        assert!(matches!(err, BridgeError::UnauthorizedProof(_)));
    }

    #[test]
    fn test_duplicate_signatures_count_once() {
        let (verifier, keys) = setup(4, 2);
        let hash = [9u8; 32];
        let sig = keys[0].sign(&hash);
        let sigs = vec![sig.clone(), sig.clone(), sig];
        let err = verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap_err();
        assert!(matches!(err, BridgeError::UnauthorizedProof(_)));
    }

    #[test]
    fn test_unknown_signer_discarded_not_fatal() {
        let (verifier, keys) = setup(3, 2);
        let hash = [9u8; 32];
        let outsider = ValidatorKeyPair::from_bytes(&[99u8; 32]);
        let sigs = vec![outsider.sign(&hash), keys[0].sign(&hash), keys[1].sign(&hash)];
        verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap();
    }

    #[test]
    fn test_invalid_signature_discarded() {
        let (verifier, keys) = setup(3, 2);
        let hash = [9u8; 32];
        let mut bad = keys[0].sign(&hash);
        bad.signature[0] ^= 0xff;
        let sigs = vec![bad, keys[1].sign(&hash)];
        let err = verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap_err();
        assert!(matches!(err, BridgeError::UnauthorizedProof(_)));
    }

    #[test]
    fn test_signature_over_different_payload_discarded() {
        let (verifier, keys) = setup(3, 2);
        let hash = [9u8; 32];
        let other_hash = [8u8; 32];
        let sigs = vec![keys[0].sign(&other_hash), keys[1].sign(&hash)];
        let err = verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap_err();
        assert!(matches!(err, BridgeError::UnauthorizedProof(_)));
    }

    #[test]
    fn test_fail_closed_when_threshold_exceeds_members() {
        // Threshold 5 with only 3 registered validators: nothing verifies.
        let (verifier, keys) = setup(3, 5);
        let hash = [9u8; 32];
        let sigs: Vec<_> = keys.iter().map(|k| k.sign(&hash)).collect();
        let err = verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap_err();
        assert!(matches!(err, BridgeError::UnauthorizedProof(_)));
    }

    #[test]
    fn test_unknown_chain_fails_closed() {
        let (verifier, keys) = setup(3, 2);
        let hash = [9u8; 32];
        let sigs: Vec<_> = keys.iter().map(|k| k.sign(&hash)).collect();
        let err = verifier.verify_quorum(ChainId(42), &hash, &sigs).unwrap_err();
        assert_eq!(err, BridgeError::UnknownChain(ChainId(42)));
    }

    #[test]
    fn test_committee_swap_applies_to_next_call() {
        let (verifier, keys) = setup(3, 2);
        let hash = [9u8; 32];
        let sigs: Vec<_> = keys[..2].iter().map(|k| k.sign(&hash)).collect();
        verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap();

        // Replace the committee with strangers; the old proof stops working.
        let new_keys: Vec<_> = (10..13u8)
            .map(|i| ValidatorKeyPair::from_bytes(&[i; 32]))
            .collect();
        let members = new_keys
            .iter()
            .map(|kp| CommitteeMember::new(kp.public_key_bytes(), "replacement"))
            .collect();
        verifier.replace_committee(ChainId(1), ValidatorCommittee::new(members, 2).unwrap());
        let err = verifier.verify_quorum(ChainId(1), &hash, &sigs).unwrap_err();
        assert!(matches!(err, BridgeError::UnauthorizedProof(_)));
    }
}
