// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the relay engine. Every rejection carries a specific
//! reason so callers and relayers can tell "try again later" from "this will
//! never succeed". Recoverable errors guarantee no state was changed.

use relay_bridge_types::{BridgeAddress, ChainId, TokenId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // -- Validation: rejected before any state change --
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("transfer amount must be positive")]
    InvalidAmount,
    #[error("bridge is paused")]
    BridgePaused,
    #[error("unknown token {0}")]
    UnknownToken(TokenId),
    #[error("no validator committee registered for chain {0}")]
    UnknownChain(ChainId),
    #[error("source and target chain must differ")]
    SameChainTransfer,
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    #[error("transfer {} already exists", hex::encode(.0))]
    DuplicateTransfer([u8; 32]),

    // -- Rate limiting: recoverable by waiting or reducing the amount --
    #[error("amount {amount} exceeds max per-transfer limit {limit}")]
    ExceedsMaxTransfer { amount: u64, limit: u64 },
    #[error("amount {amount} would exceed daily limit {limit} (already used {used})")]
    ExceedsDailyLimit { amount: u64, used: u64, limit: u64 },
    #[error("amount {amount} would exceed weekly limit {limit} (already used {used})")]
    ExceedsWeeklyLimit { amount: u64, used: u64, limit: u64 },
    #[error("large-transfer cooldown not elapsed, {remaining_secs}s remaining")]
    CooldownNotElapsed { remaining_secs: u64 },

    // -- Proof handling: no state change, transfer stays retryable --
    #[error("unauthorized proof: {0}")]
    UnauthorizedProof(String),
    #[error("transfer or message {} was already processed", hex::encode(.0))]
    AlreadyProcessed([u8; 32]),
    #[error("unknown transfer {}", hex::encode(.0))]
    UnknownTransfer([u8; 32]),
    #[error("transfer {} has expired", hex::encode(.0))]
    TransferExpired([u8; 32]),
    #[error("transfer {} is not refundable in its current state", hex::encode(.0))]
    NotRefundable([u8; 32]),

    // -- Authorization --
    #[error("caller {0} is not authorized for this operation")]
    Unauthorized(BridgeAddress),

    // -- Fatal: releases for the token are halted pending intervention --
    #[error(
        "insolvency violation for token {token}: custody {custody} cannot cover {requested}"
    )]
    InsolvencyViolation {
        token: TokenId,
        custody: u64,
        requested: u64,
    },

    #[error("invalid configuration: {0}")]
    ConfigError(String),
    #[error("{0}")]
    Generic(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Fatal errors indicate a logic bug somewhere in the pipeline, not bad
    /// input; they must halt further releases rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::InsolvencyViolation { .. })
    }

    /// Stable label for metrics, one per rejection reason.
    pub fn reason_label(&self) -> &'static str {
        match self {
            BridgeError::InvalidAddress(_) => "invalid_address",
            BridgeError::InvalidAmount => "invalid_amount",
            BridgeError::BridgePaused => "paused",
            BridgeError::UnknownToken(_) => "unknown_token",
            BridgeError::UnknownChain(_) => "unknown_chain",
            BridgeError::SameChainTransfer => "same_chain",
            BridgeError::InsufficientBalance => "insufficient_balance",
            BridgeError::DuplicateTransfer(_) => "duplicate_transfer",
            BridgeError::ExceedsMaxTransfer { .. } => "exceeds_max_transfer",
            BridgeError::ExceedsDailyLimit { .. } => "exceeds_daily_limit",
            BridgeError::ExceedsWeeklyLimit { .. } => "exceeds_weekly_limit",
            BridgeError::CooldownNotElapsed { .. } => "cooldown_not_elapsed",
            BridgeError::UnauthorizedProof(_) => "unauthorized_proof",
            BridgeError::AlreadyProcessed(_) => "already_processed",
            BridgeError::UnknownTransfer(_) => "unknown_transfer",
            BridgeError::TransferExpired(_) => "transfer_expired",
            BridgeError::NotRefundable(_) => "not_refundable",
            BridgeError::Unauthorized(_) => "unauthorized",
            BridgeError::InsolvencyViolation { .. } => "insolvency_violation",
            BridgeError::ConfigError(_) => "config_error",
            BridgeError::Generic(_) => "generic",
        }
    }
}
