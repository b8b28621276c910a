// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Validator attestation crypto. Validators sign the canonical payload hash
//! of a transfer or message with Ed25519; the engine verifies signatures
//! against the registered committee for the payload's source chain.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::fmt;

/// Raw Ed25519 public key bytes, used as the committee map key.
pub type ValidatorPublicKeyBytes = [u8; 32];

/// A validator signing identity.
pub struct ValidatorKeyPair {
    signing_key: SigningKey,
}

impl ValidatorKeyPair {
    pub fn generate<R: rand::RngCore + rand::CryptoRng>(rng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::generate(rng),
        }
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key_bytes(&self) -> ValidatorPublicKeyBytes {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn sign(&self, payload_hash: &[u8; 32]) -> ValidatorSignInfo {
        let signature = self.signing_key.sign(payload_hash);
        ValidatorSignInfo {
            validator: self.public_key_bytes(),
            signature: signature.to_bytes(),
        }
    }
}

impl fmt::Debug for ValidatorKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the private half.
        write!(
            f,
            "ValidatorKeyPair({})",
            hex::encode(self.public_key_bytes())
        )
    }
}

/// One validator's attestation over a payload hash.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSignInfo {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub validator: ValidatorPublicKeyBytes,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub signature: [u8; 64],
}

impl ValidatorSignInfo {
    /// Cryptographic check only; committee membership is the verifier's job.
    /// Malformed keys or signatures verify as false rather than erroring,
    /// because an attacker controls these bytes.
    pub fn verify(&self, payload_hash: &[u8; 32]) -> bool {
        let Ok(public_key) = VerifyingKey::from_bytes(&self.validator) else {
            return false;
        };
        let signature = Signature::from_bytes(&self.signature);
        public_key.verify_strict(payload_hash, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let kp = ValidatorKeyPair::generate(&mut rand::thread_rng());
        let hash = [42u8; 32];
        let sig = kp.sign(&hash);
        assert!(sig.verify(&hash));
    }

    #[test]
    fn test_verify_rejects_wrong_payload() {
        let kp = ValidatorKeyPair::generate(&mut rand::thread_rng());
        let sig = kp.sign(&[42u8; 32]);
        assert!(!sig.verify(&[43u8; 32]));
    }

    #[test]
    fn test_verify_rejects_tampered_signer() {
        let kp = ValidatorKeyPair::generate(&mut rand::thread_rng());
        let other = ValidatorKeyPair::generate(&mut rand::thread_rng());
        let hash = [42u8; 32];
        let mut sig = kp.sign(&hash);
        // Claiming another validator's identity must not verify.
        sig.validator = other.public_key_bytes();
        assert!(!sig.verify(&hash));
    }

    #[test]
    fn test_keypair_round_trip() {
        let kp = ValidatorKeyPair::generate(&mut rand::thread_rng());
        let restored = ValidatorKeyPair::from_bytes(&kp.to_bytes());
        assert_eq!(kp.public_key_bytes(), restored.public_key_bytes());
    }
}
