// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Chain-agnostic data model shared by the bridge relay engine and its
//! clients: addresses, transfers, messages, canonical payload hashing, and
//! the validator committee / signature types used for proof verification.

pub mod base_types;
pub mod committee;
pub mod crypto;
pub mod messages;

pub use base_types::{BridgeAddress, ChainId, TokenId};
pub use committee::{CommitteeMember, ValidatorCommittee};
pub use crypto::{ValidatorKeyPair, ValidatorPublicKeyBytes, ValidatorSignInfo};
pub use messages::{
    BridgeMessage, MessageId, TokenTransfer, TransferId, TransferRecord, TransferStatus,
};
