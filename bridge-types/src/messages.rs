// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transfer and message payloads, their deterministic identifiers, and the
//! canonical payload hashes validators sign. Identifiers and hashes are
//! Keccak-256 over a domain-separation prefix followed by the bcs encoding
//! of the payload, so two distinct payloads can never collide and a hash
//! signed in one context is useless in another.

use crate::base_types::{BridgeAddress, ChainId, TokenId};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Deterministic transfer identifier, unique by construction.
pub type TransferId = [u8; 32];

/// Deterministic message identifier, same discipline as [`TransferId`].
pub type MessageId = [u8; 32];

const TRANSFER_ID_PREFIX: &[u8] = b"BRIDGE_TRANSFER_ID";
const TRANSFER_PAYLOAD_PREFIX: &[u8] = b"BRIDGE_TRANSFER_PAYLOAD";
const MESSAGE_ID_PREFIX: &[u8] = b"BRIDGE_MESSAGE_ID";
const MESSAGE_PAYLOAD_PREFIX: &[u8] = b"BRIDGE_MESSAGE_PAYLOAD";

fn keccak_with_prefix<T: Serialize>(prefix: &[u8], value: &T) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(prefix);
    // bcs serialization of these types cannot fail: no maps, no floats.
    hasher.update(bcs::to_bytes(value).expect("bcs serialization should not fail"));
    hasher.finalize().into()
}

/// A cross-chain token transfer as submitted by the sender. The nonce is
/// chosen by the caller and folded into the id, so resubmitting the same
/// economic transfer with a fresh nonce yields a fresh id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub sender: BridgeAddress,
    pub recipient: BridgeAddress,
    pub token: TokenId,
    pub amount: u64,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub nonce: u64,
}

impl TokenTransfer {
    pub fn transfer_id(&self) -> TransferId {
        keccak_with_prefix(TRANSFER_ID_PREFIX, self)
    }

    /// The hash validators attest to. Covers every field of the transfer,
    /// recipient included, so a quorum over one transfer cannot authorize
    /// any other.
    pub fn payload_hash(&self) -> [u8; 32] {
        keccak_with_prefix(TRANSFER_PAYLOAD_PREFIX, self)
    }
}

/// An arbitrary cross-chain message. Unlike transfers there is no custody
/// involved; the engine only guarantees authenticity and at-most-once
/// delivery.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub sender: BridgeAddress,
    pub recipient: BridgeAddress,
    pub payload: Vec<u8>,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub nonce: u64,
}

impl BridgeMessage {
    pub fn message_id(&self) -> MessageId {
        keccak_with_prefix(MESSAGE_ID_PREFIX, self)
    }

    /// The signed hash covers the recipient identity, so a proof collected
    /// for one recipient cannot be replayed against a different one.
    pub fn payload_hash(&self) -> [u8; 32] {
        keccak_with_prefix(MESSAGE_PAYLOAD_PREFIX, self)
    }
}

/// Lifecycle of a transfer on the relay.
///
/// `Initiated` is transient: it exists only while the initiating call is
/// still locking funds. Durable records start at `AwaitingProof`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Initiated,
    AwaitingProof,
    Released,
    Rejected,
    Expired,
}

/// Durable per-transfer record. Records are never deleted; they are the
/// audit trail of the bridge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub transfer: TokenTransfer,
    /// Unix seconds at initiation.
    pub created_at: u64,
    pub status: TransferStatus,
}

impl TransferRecord {
    pub fn new(transfer: TokenTransfer, created_at: u64) -> Self {
        Self {
            id: transfer.transfer_id(),
            transfer,
            created_at,
            status: TransferStatus::Initiated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_transfer() -> TokenTransfer {
        TokenTransfer {
            sender: BridgeAddress::new([1u8; 32]),
            recipient: BridgeAddress::new([2u8; 32]),
            token: TokenId(1),
            amount: 1_000,
            source_chain: ChainId(1),
            target_chain: ChainId(2),
            nonce: 7,
        }
    }

    #[test]
    fn test_transfer_id_deterministic() {
        assert_eq!(test_transfer().transfer_id(), test_transfer().transfer_id());
    }

    #[test]
    fn test_transfer_id_changes_with_every_field() {
        let base = test_transfer();
        let mut variants = vec![base.clone(); 7];
        variants[0].sender = BridgeAddress::new([9u8; 32]);
        variants[1].recipient = BridgeAddress::new([9u8; 32]);
        variants[2].token = TokenId(9);
        variants[3].amount = 9;
        variants[4].source_chain = ChainId(9);
        variants[5].target_chain = ChainId(9);
        variants[6].nonce = 9;
        for variant in variants {
            assert_ne!(base.transfer_id(), variant.transfer_id());
            assert_ne!(base.payload_hash(), variant.payload_hash());
        }
    }

    #[test]
    fn test_id_and_payload_hash_domains_differ() {
        let transfer = test_transfer();
        assert_ne!(transfer.transfer_id(), transfer.payload_hash());
    }

    #[test]
    fn test_message_hash_covers_recipient() {
        let message = BridgeMessage {
            sender: BridgeAddress::new([1u8; 32]),
            recipient: BridgeAddress::new([2u8; 32]),
            payload: b"hello".to_vec(),
            source_chain: ChainId(1),
            target_chain: ChainId(2),
            nonce: 0,
        };
        let mut redirected = message.clone();
        redirected.recipient = BridgeAddress::new([3u8; 32]);
        assert_ne!(message.payload_hash(), redirected.payload_hash());
        assert_ne!(message.message_id(), redirected.message_id());
    }
}
