// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The relay engine: orchestrates verification, replay protection, rate
//! limiting and custody into the transfer lifecycle
//! `Initiated -> AwaitingProof -> {Released | Rejected | Expired}`.
//!
//! Every operation takes the acting address explicitly; authorization is
//! decided by the [`RolePolicy`], never by ambient context. Operations also
//! come in `_at` variants taking an explicit unix timestamp, with the
//! wall-clock versions layered on top, so every time-dependent behavior is
//! testable without sleeping.
//!
//! Locking is per key: one async mutex per transfer id for completion and
//! refund, one per user inside the limiter. There is no global engine lock
//! on the hot path.

use crate::config::{AdminParams, BridgeLimitsConfig, UserLimits, MAX_FEE_BPS};
use crate::error::{BridgeError, BridgeResult};
use crate::events::{BridgeEvent, EventBus};
use crate::limiter::TransferLimiter;
use crate::metrics::BridgeMetrics;
use crate::replay::ReplayGuard;
use crate::token::{TokenLedger, TokenManager, TokenMeta};
use crate::utils::current_time_secs;
use crate::verifier::SignatureVerifier;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use relay_bridge_types::{
    BridgeAddress, BridgeMessage, ChainId, CommitteeMember, MessageId, TokenId, TokenTransfer,
    TransferId, TransferRecord, TransferStatus, ValidatorCommittee, ValidatorPublicKeyBytes,
    ValidatorSignInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Decides which addresses may perform governance operations.
pub trait RolePolicy: Send + Sync {
    fn is_admin(&self, caller: &BridgeAddress) -> bool;
}

/// Fixed admin set loaded from config.
pub struct StaticRolePolicy {
    admins: BTreeSet<BridgeAddress>,
}

impl StaticRolePolicy {
    pub fn new(admins: impl IntoIterator<Item = BridgeAddress>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

impl RolePolicy for StaticRolePolicy {
    fn is_admin(&self, caller: &BridgeAddress) -> bool {
        self.admins.contains(caller)
    }
}

/// Validator attestations submitted to complete a transfer or deliver a
/// message. The attested payload is always recomputed from engine state,
/// never taken from the submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProof {
    pub signatures: Vec<ValidatorSignInfo>,
}

pub struct BridgeEngine {
    local_chain: ChainId,
    params: ArcSwap<AdminParams>,
    // Serializes governance clone-and-swap updates.
    admin_lock: Mutex<()>,
    paused: AtomicBool,
    verifier: SignatureVerifier,
    replay: ReplayGuard,
    limiter: TransferLimiter,
    tokens: TokenManager,
    roles: Arc<dyn RolePolicy>,
    records: Mutex<HashMap<TransferId, TransferRecord>>,
    completion_locks: Mutex<HashMap<TransferId, Arc<AsyncMutex<()>>>>,
    sent_messages: Mutex<HashMap<MessageId, BridgeMessage>>,
    received_messages: Mutex<HashMap<MessageId, BridgeMessage>>,
    events: EventBus,
    metrics: Arc<BridgeMetrics>,
}

impl BridgeEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        local_chain: ChainId,
        committees: BTreeMap<ChainId, ValidatorCommittee>,
        params: AdminParams,
        ledger: Arc<dyn TokenLedger>,
        custody_address: BridgeAddress,
        tokens: Vec<TokenMeta>,
        roles: Arc<dyn RolePolicy>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            local_chain,
            params: ArcSwap::from_pointee(params),
            admin_lock: Mutex::new(()),
            paused: AtomicBool::new(false),
            verifier: SignatureVerifier::new(committees),
            replay: ReplayGuard::new(),
            limiter: TransferLimiter::new(),
            tokens: TokenManager::new(ledger, custody_address, tokens),
            roles,
            records: Mutex::new(HashMap::new()),
            completion_locks: Mutex::new(HashMap::new()),
            sent_messages: Mutex::new(HashMap::new()),
            received_messages: Mutex::new(HashMap::new()),
            events: EventBus::new(),
            metrics,
        }
    }

    pub fn local_chain(&self) -> ChainId {
        self.local_chain
    }

    pub fn params(&self) -> Arc<AdminParams> {
        self.params.load_full()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn limiter(&self) -> &TransferLimiter {
        &self.limiter
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn ensure_unpaused(&self) -> BridgeResult<()> {
        if self.is_paused() {
            return Err(BridgeError::BridgePaused);
        }
        Ok(())
    }

    fn ensure_admin(&self, caller: &BridgeAddress) -> BridgeResult<()> {
        if self.roles.is_admin(caller) {
            Ok(())
        } else {
            Err(BridgeError::Unauthorized(*caller))
        }
    }

    fn completion_lock(&self, id: &TransferId) -> Arc<AsyncMutex<()>> {
        self.completion_locks.lock().entry(*id).or_default().clone()
    }

    fn track<T>(&self, result: BridgeResult<T>) -> BridgeResult<T> {
        if let Err(e) = &result {
            self.metrics
                .transfers_rejected
                .with_label_values(&[e.reason_label()])
                .inc();
        }
        result
    }

    async fn refresh_token_gauges(&self, token: TokenId) {
        let books = self.tokens.books(token).await;
        let label = token.to_string();
        self.metrics
            .amount_locked
            .with_label_values(&[&label])
            .set(books.total_locked as i64);
        self.metrics
            .amount_minted
            .with_label_values(&[&label])
            .set(books.total_minted as i64);
    }

    // -- Transfer lifecycle --

    pub async fn initiate_transfer(
        &self,
        caller: &BridgeAddress,
        recipient: BridgeAddress,
        token: TokenId,
        amount: u64,
        target_chain: ChainId,
        nonce: u64,
    ) -> BridgeResult<TransferRecord> {
        self.initiate_transfer_at(caller, recipient, token, amount, target_chain, nonce, current_time_secs())
            .await
    }

    /// Lock (or burn, for a wrapped token returning home) `amount` minus fee
    /// and record the transfer as awaiting proof. On any rejection no usage
    /// is consumed and no funds move.
    #[allow(clippy::too_many_arguments)]
    pub async fn initiate_transfer_at(
        &self,
        caller: &BridgeAddress,
        recipient: BridgeAddress,
        token: TokenId,
        amount: u64,
        target_chain: ChainId,
        nonce: u64,
        now: u64,
    ) -> BridgeResult<TransferRecord> {
        let result = self
            .initiate_inner(caller, recipient, token, amount, target_chain, nonce, now)
            .await;
        self.track(result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn initiate_inner(
        &self,
        caller: &BridgeAddress,
        recipient: BridgeAddress,
        token: TokenId,
        amount: u64,
        target_chain: ChainId,
        nonce: u64,
        now: u64,
    ) -> BridgeResult<TransferRecord> {
        self.ensure_unpaused()?;
        if amount == 0 {
            return Err(BridgeError::InvalidAmount);
        }
        if caller.is_zero() {
            return Err(BridgeError::InvalidAddress(
                "sender is the zero address".to_string(),
            ));
        }
        if recipient.is_zero() {
            return Err(BridgeError::InvalidAddress(
                "recipient is the zero address".to_string(),
            ));
        }
        if target_chain == self.local_chain {
            return Err(BridgeError::SameChainTransfer);
        }
        if self.verifier.committee(target_chain).is_none() {
            return Err(BridgeError::UnknownChain(target_chain));
        }
        let meta = self.tokens.token_meta(token)?.clone();

        let params = self.params.load_full();
        // Fee comes off the top; only the net amount is bridged and only the
        // net amount counts against rate limits.
        let fee = (amount as u128 * params.fee_bps as u128 / MAX_FEE_BPS as u128) as u64;
        let net = amount - fee;
        if net == 0 {
            return Err(BridgeError::InvalidAmount);
        }

        let transfer = TokenTransfer {
            sender: *caller,
            recipient,
            token,
            amount: net,
            source_chain: self.local_chain,
            target_chain,
            nonce,
        };
        let id = transfer.transfer_id();
        // Serialize concurrent initiations of the same id.
        let lock = self.completion_lock(&id);
        let _guard = lock.lock().await;
        if self.records.lock().contains_key(&id) {
            return Err(BridgeError::DuplicateTransfer(id));
        }

        // State-free rejection for the common underfunded case, before any
        // usage is consumed.
        if self.tokens.balance_of(token, caller).await < amount {
            return Err(BridgeError::InsufficientBalance);
        }

        let limits = params.effective_limits(caller);
        self.limiter
            .check_and_record(caller, net, now, &limits)
            .await?;

        if let Err(e) = self
            .move_into_custody(&meta, token, caller, &params.fee_collector, fee, net)
            .await
        {
            // A custody failure must not leave the attempt counted.
            self.limiter.rollback(caller, net, now, &limits).await;
            return Err(e);
        }

        let mut record = TransferRecord::new(transfer, now);
        record.status = TransferStatus::AwaitingProof;
        self.records.lock().insert(id, record.clone());

        self.metrics.transfers_initiated.inc();
        self.metrics.pending_transfers.inc();
        self.refresh_token_gauges(token).await;
        self.events.emit(BridgeEvent::TokenDeposited {
            transfer_id: id,
            sender: *caller,
            token,
            amount: net,
            fee,
            target_chain,
        });
        info!(
            transfer_id = %hex::encode(id),
            sender = %caller,
            amount = net,
            fee,
            %target_chain,
            "transfer initiated"
        );
        Ok(record)
    }

    /// Collect the fee and lock (or burn) the net amount. On failure the fee
    /// is returned, leaving the caller's balances untouched.
    async fn move_into_custody(
        &self,
        meta: &TokenMeta,
        token: TokenId,
        caller: &BridgeAddress,
        fee_collector: &BridgeAddress,
        fee: u64,
        net: u64,
    ) -> BridgeResult<()> {
        self.tokens
            .collect_fee(token, caller, fee_collector, fee)
            .await?;
        let moved = if meta.origin_chain == self.local_chain {
            self.tokens.lock(token, caller, net).await
        } else {
            // Wrapped token heading back to its origin chain.
            self.tokens.burn(token, caller, net).await
        };
        if let Err(e) = moved {
            // The collector just received the fee, so this cannot fail.
            self.tokens
                .collect_fee(token, fee_collector, caller, fee)
                .await?;
            return Err(e);
        }
        Ok(())
    }

    pub async fn complete_transfer(
        &self,
        id: TransferId,
        proof: &TransferProof,
    ) -> BridgeResult<TransferRecord> {
        self.complete_transfer_at(id, proof, current_time_secs()).await
    }

    /// Pay out a transfer against a quorum of validator signatures.
    ///
    /// The attested payload is recomputed from the stored record, so a proof
    /// collected for one transfer can never complete another. The id is
    /// marked processed only after the payout succeeded; a failed attempt
    /// leaves the transfer retryable.
    pub async fn complete_transfer_at(
        &self,
        id: TransferId,
        proof: &TransferProof,
        now: u64,
    ) -> BridgeResult<TransferRecord> {
        let result = self.complete_inner(id, proof, now).await;
        self.track(result)
    }

    async fn complete_inner(
        &self,
        id: TransferId,
        proof: &TransferProof,
        now: u64,
    ) -> BridgeResult<TransferRecord> {
        self.ensure_unpaused()?;
        let lock = self.completion_lock(&id);
        let _guard = lock.lock().await;

        let record = self
            .records
            .lock()
            .get(&id)
            .cloned()
            .ok_or(BridgeError::UnknownTransfer(id))?;
        match record.status {
            TransferStatus::AwaitingProof => {}
            TransferStatus::Released | TransferStatus::Rejected => {
                return Err(BridgeError::AlreadyProcessed(id))
            }
            TransferStatus::Expired => return Err(BridgeError::TransferExpired(id)),
            TransferStatus::Initiated => return Err(BridgeError::UnknownTransfer(id)),
        }

        let params = self.params.load_full();
        if now >= record.created_at.saturating_add(params.transfer_expiry_secs) {
            self.expire_record(&id);
            return Err(BridgeError::TransferExpired(id));
        }

        let payload_hash = record.transfer.payload_hash();
        self.verifier
            .verify_quorum(record.transfer.source_chain, &payload_hash, &proof.signatures)?;

        if self.replay.is_processed(&id) {
            return Err(BridgeError::AlreadyProcessed(id));
        }

        let transfer = &record.transfer;
        let meta = self.tokens.token_meta(transfer.token)?.clone();
        if meta.origin_chain == transfer.source_chain {
            // Native token left its origin: the destination side mints
            // wrapped supply.
            self.tokens
                .mint(transfer.token, &transfer.recipient, transfer.amount)
                .await?;
        } else {
            // Wrapped token returned home: release the custody backing it.
            self.tokens
                .release(transfer.token, &transfer.recipient, transfer.amount)
                .await?;
        }
        self.replay.mark_if_unprocessed(id);

        // Guard scoped so the future stays Send across the awaits below.
        let released = {
            let mut records = self.records.lock();
            let stored = records
                .get_mut(&id)
                .ok_or(BridgeError::UnknownTransfer(id))?;
            stored.status = TransferStatus::Released;
            stored.clone()
        };

        self.metrics.transfers_released.inc();
        self.metrics.pending_transfers.dec();
        self.refresh_token_gauges(transfer.token).await;
        self.events.emit(BridgeEvent::TransferClaimed {
            transfer_id: id,
            recipient: transfer.recipient,
            token: transfer.token,
            amount: transfer.amount,
        });
        info!(transfer_id = %hex::encode(id), recipient = %transfer.recipient, "transfer released");
        Ok(released)
    }

    pub async fn refund_expired(&self, id: TransferId) -> BridgeResult<TransferRecord> {
        self.refund_expired_at(id, current_time_secs()).await
    }

    /// Return the net amount of an expired transfer to its original sender.
    /// Callable by anyone; funds only ever go back to the sender. The fee is
    /// not refunded. Idempotent: a second refund reports AlreadyProcessed.
    pub async fn refund_expired_at(&self, id: TransferId, now: u64) -> BridgeResult<TransferRecord> {
        let result = self.refund_inner(id, now).await;
        self.track(result)
    }

    async fn refund_inner(&self, id: TransferId, now: u64) -> BridgeResult<TransferRecord> {
        self.ensure_unpaused()?;
        let lock = self.completion_lock(&id);
        let _guard = lock.lock().await;

        let record = self
            .records
            .lock()
            .get(&id)
            .cloned()
            .ok_or(BridgeError::UnknownTransfer(id))?;
        let params = self.params.load_full();
        match record.status {
            TransferStatus::AwaitingProof => {
                if now < record.created_at.saturating_add(params.transfer_expiry_secs) {
                    return Err(BridgeError::NotRefundable(id));
                }
                self.expire_record(&id);
            }
            TransferStatus::Expired => {}
            _ => return Err(BridgeError::NotRefundable(id)),
        }
        if self.replay.is_processed(&id) {
            return Err(BridgeError::AlreadyProcessed(id));
        }

        let transfer = &record.transfer;
        self.undo_custody(transfer).await?;
        self.replay.mark_if_unprocessed(id);

        self.metrics.transfers_refunded.inc();
        self.refresh_token_gauges(transfer.token).await;
        self.events.emit(BridgeEvent::TransferRefunded {
            transfer_id: id,
            sender: transfer.sender,
            token: transfer.token,
            amount: transfer.amount,
        });
        info!(transfer_id = %hex::encode(id), sender = %transfer.sender, "expired transfer refunded");
        Ok(self
            .records
            .lock()
            .get(&id)
            .cloned()
            .ok_or(BridgeError::UnknownTransfer(id))?)
    }

    /// Reject a pending transfer and return the funds to the sender.
    /// Governance-only escape hatch for transfers that must not complete.
    pub async fn reject_transfer_at(
        &self,
        caller: &BridgeAddress,
        id: TransferId,
        _now: u64,
    ) -> BridgeResult<TransferRecord> {
        let result = self.reject_inner(caller, id).await;
        self.track(result)
    }

    async fn reject_inner(
        &self,
        caller: &BridgeAddress,
        id: TransferId,
    ) -> BridgeResult<TransferRecord> {
        self.ensure_admin(caller)?;
        let lock = self.completion_lock(&id);
        let _guard = lock.lock().await;

        let record = self
            .records
            .lock()
            .get(&id)
            .cloned()
            .ok_or(BridgeError::UnknownTransfer(id))?;
        if record.status != TransferStatus::AwaitingProof {
            return Err(BridgeError::NotRefundable(id));
        }
        if self.replay.is_processed(&id) {
            return Err(BridgeError::AlreadyProcessed(id));
        }

        self.undo_custody(&record.transfer).await?;
        self.replay.mark_if_unprocessed(id);

        let rejected = {
            let mut records = self.records.lock();
            let stored = records
                .get_mut(&id)
                .ok_or(BridgeError::UnknownTransfer(id))?;
            stored.status = TransferStatus::Rejected;
            stored.clone()
        };

        self.metrics.pending_transfers.dec();
        self.refresh_token_gauges(record.transfer.token).await;
        self.events
            .emit(BridgeEvent::TransferRejected { transfer_id: id });
        warn!(transfer_id = %hex::encode(id), admin = %caller, "transfer rejected by governance");
        Ok(rejected)
    }

    /// Reverse the custody effect of an initiation: release locked funds
    /// back to the sender, or re-mint what was burned.
    async fn undo_custody(&self, transfer: &TokenTransfer) -> BridgeResult<()> {
        let meta = self.tokens.token_meta(transfer.token)?.clone();
        if meta.origin_chain == transfer.source_chain {
            self.tokens
                .release(transfer.token, &transfer.sender, transfer.amount)
                .await
        } else {
            self.tokens
                .mint(transfer.token, &transfer.sender, transfer.amount)
                .await
        }
    }

    fn expire_record(&self, id: &TransferId) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(id) {
            if record.status == TransferStatus::AwaitingProof {
                record.status = TransferStatus::Expired;
                self.metrics.transfers_expired.inc();
                self.metrics.pending_transfers.dec();
                self.events
                    .emit(BridgeEvent::TransferExpired { transfer_id: *id });
            }
        }
    }

    /// Look up a transfer, applying lazy expiry as of `now`.
    pub fn transfer_record_at(&self, id: &TransferId, now: u64) -> Option<TransferRecord> {
        let expired = {
            let records = self.records.lock();
            let record = records.get(id)?;
            record.status == TransferStatus::AwaitingProof
                && now
                    >= record
                        .created_at
                        .saturating_add(self.params.load().transfer_expiry_secs)
        };
        if expired {
            self.expire_record(id);
        }
        self.records.lock().get(id).cloned()
    }

    pub fn transfer_record(&self, id: &TransferId) -> Option<TransferRecord> {
        self.transfer_record_at(id, current_time_secs())
    }

    // -- Messages --

    /// Record an outbound cross-chain message and hand it to observers.
    pub fn send_message(
        &self,
        caller: &BridgeAddress,
        recipient: BridgeAddress,
        payload: Vec<u8>,
        target_chain: ChainId,
        nonce: u64,
    ) -> BridgeResult<MessageId> {
        let result = self.send_message_inner(caller, recipient, payload, target_chain, nonce);
        self.track(result)
    }

    fn send_message_inner(
        &self,
        caller: &BridgeAddress,
        recipient: BridgeAddress,
        payload: Vec<u8>,
        target_chain: ChainId,
        nonce: u64,
    ) -> BridgeResult<MessageId> {
        self.ensure_unpaused()?;
        if target_chain == self.local_chain {
            return Err(BridgeError::SameChainTransfer);
        }
        if self.verifier.committee(target_chain).is_none() {
            return Err(BridgeError::UnknownChain(target_chain));
        }
        let message = BridgeMessage {
            sender: *caller,
            recipient,
            payload,
            source_chain: self.local_chain,
            target_chain,
            nonce,
        };
        let id = message.message_id();
        let mut sent = self.sent_messages.lock();
        if sent.contains_key(&id) {
            return Err(BridgeError::AlreadyProcessed(id));
        }
        sent.insert(id, message);
        drop(sent);

        self.metrics.messages_sent.inc();
        self.events.emit(BridgeEvent::MessageSent {
            message_id: id,
            target_chain,
        });
        Ok(id)
    }

    /// Accept an inbound message under a validator quorum, at most once.
    pub fn receive_message(
        &self,
        message: BridgeMessage,
        proof: &TransferProof,
    ) -> BridgeResult<MessageId> {
        let result = self.receive_message_inner(message, proof);
        self.track(result)
    }

    fn receive_message_inner(
        &self,
        message: BridgeMessage,
        proof: &TransferProof,
    ) -> BridgeResult<MessageId> {
        self.ensure_unpaused()?;
        if message.target_chain != self.local_chain {
            return Err(BridgeError::UnknownChain(message.target_chain));
        }
        let payload_hash = message.payload_hash();
        self.verifier
            .verify_quorum(message.source_chain, &payload_hash, &proof.signatures)?;

        let id = message.message_id();
        // Atomic check-and-set: the quorum is already verified and recording
        // the message cannot fail, so the mark is the single gate two
        // concurrent deliveries race on.
        if !self.replay.mark_if_unprocessed(id) {
            return Err(BridgeError::AlreadyProcessed(id));
        }
        let source_chain = message.source_chain;
        self.received_messages.lock().insert(id, message);

        self.metrics.messages_received.inc();
        self.events.emit(BridgeEvent::MessageReceived {
            message_id: id,
            source_chain,
        });
        Ok(id)
    }

    pub fn received_message(&self, id: &MessageId) -> Option<BridgeMessage> {
        self.received_messages.lock().get(id).cloned()
    }

    pub fn sent_message(&self, id: &MessageId) -> Option<BridgeMessage> {
        self.sent_messages.lock().get(id).cloned()
    }

    // -- Governance --

    pub fn pause(&self, caller: &BridgeAddress) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.paused.store(true, Ordering::SeqCst);
        self.metrics.bridge_paused.set(1);
        self.events.emit(BridgeEvent::EmergencyOp { paused: true });
        warn!(admin = %caller, "bridge paused");
        Ok(())
    }

    pub fn unpause(&self, caller: &BridgeAddress) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.paused.store(false, Ordering::SeqCst);
        self.metrics.bridge_paused.set(0);
        self.events.emit(BridgeEvent::EmergencyOp { paused: false });
        info!(admin = %caller, "bridge unpaused");
        Ok(())
    }

    fn update_params(&self, apply: impl FnOnce(&mut AdminParams)) {
        let _guard = self.admin_lock.lock();
        let mut next = (**self.params.load()).clone();
        apply(&mut next);
        self.params.store(Arc::new(next));
    }

    /// Replace the global limits. Usage counters are untouched: already
    /// recorded usage keeps counting against the new limits.
    pub fn update_limits(
        &self,
        caller: &BridgeAddress,
        limits: BridgeLimitsConfig,
    ) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_params(|params| params.limits = limits);
        self.events.emit(BridgeEvent::LimitsUpdated);
        info!(admin = %caller, "global limits updated");
        Ok(())
    }

    pub fn set_max_transfer_amount(&self, caller: &BridgeAddress, amount: u64) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_params(|params| params.limits.max_per_transfer = amount);
        self.events.emit(BridgeEvent::LimitsUpdated);
        Ok(())
    }

    pub fn set_daily_transfer_limit(&self, caller: &BridgeAddress, limit: u64) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_params(|params| params.limits.daily_limit = limit);
        self.events.emit(BridgeEvent::LimitsUpdated);
        Ok(())
    }

    pub fn set_weekly_transfer_limit(&self, caller: &BridgeAddress, limit: u64) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_params(|params| params.limits.weekly_limit = limit);
        self.events.emit(BridgeEvent::LimitsUpdated);
        Ok(())
    }

    pub fn set_large_transfer_threshold(
        &self,
        caller: &BridgeAddress,
        threshold: u64,
    ) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_params(|params| params.limits.large_transfer_threshold = threshold);
        self.events.emit(BridgeEvent::LimitsUpdated);
        Ok(())
    }

    pub fn set_default_cooldown(&self, caller: &BridgeAddress, secs: u64) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_params(|params| params.limits.default_cooldown_secs = secs);
        self.events.emit(BridgeEvent::LimitsUpdated);
        Ok(())
    }

    pub fn set_user_limits(
        &self,
        caller: &BridgeAddress,
        user: BridgeAddress,
        limits: UserLimits,
    ) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_params(|params| {
            params.user_limits.insert(user, limits);
        });
        self.events.emit(BridgeEvent::LimitsUpdated);
        info!(admin = %caller, %user, "per-user limits updated");
        Ok(())
    }

    pub fn clear_user_limits(&self, caller: &BridgeAddress, user: &BridgeAddress) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_params(|params| {
            params.user_limits.remove(user);
        });
        self.events.emit(BridgeEvent::LimitsUpdated);
        Ok(())
    }

    pub fn set_fee(
        &self,
        caller: &BridgeAddress,
        fee_bps: u64,
        fee_collector: BridgeAddress,
    ) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        if fee_bps > MAX_FEE_BPS {
            return Err(BridgeError::ConfigError(format!(
                "fee-bps {fee_bps} exceeds {MAX_FEE_BPS}"
            )));
        }
        if fee_bps > 0 && fee_collector.is_zero() {
            return Err(BridgeError::ConfigError(
                "fee-collector must be set when fee-bps is nonzero".to_string(),
            ));
        }
        self.update_params(|params| {
            params.fee_bps = fee_bps;
            params.fee_collector = fee_collector;
        });
        Ok(())
    }

    /// Install a new validator committee for `chain`. Applies to the next
    /// verification; proofs already being verified keep the old snapshot.
    pub fn replace_committee(
        &self,
        caller: &BridgeAddress,
        chain: ChainId,
        committee: ValidatorCommittee,
    ) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        // Same lock as the read-modify-write edits, so a replacement and a
        // membership edit cannot silently lose each other.
        let _guard = self.admin_lock.lock();
        self.verifier.replace_committee(chain, committee);
        self.events.emit(BridgeEvent::ValidatorSetUpdated { chain });
        info!(admin = %caller, %chain, "validator committee replaced");
        Ok(())
    }

    // Read-modify-write of one committee, serialized by the admin lock.
    fn update_committee(
        &self,
        chain: ChainId,
        apply: impl FnOnce(&mut Vec<CommitteeMember>, &mut u16) -> BridgeResult<()>,
    ) -> BridgeResult<()> {
        let _guard = self.admin_lock.lock();
        let current = self
            .verifier
            .committee(chain)
            .ok_or(BridgeError::UnknownChain(chain))?;
        let mut members: Vec<CommitteeMember> = current.members().values().cloned().collect();
        let mut min_validators = current.min_validators();
        apply(&mut members, &mut min_validators)?;
        let committee = ValidatorCommittee::new(members, min_validators)
            .map_err(|e| BridgeError::ConfigError(e.to_string()))?;
        self.verifier.replace_committee(chain, committee);
        self.events.emit(BridgeEvent::ValidatorSetUpdated { chain });
        Ok(())
    }

    pub fn add_validator(
        &self,
        caller: &BridgeAddress,
        chain: ChainId,
        public_key: ValidatorPublicKeyBytes,
        name: String,
    ) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_committee(chain, |members, _| {
            members.push(CommitteeMember::new(public_key, name));
            Ok(())
        })?;
        info!(admin = %caller, %chain, validator = %hex::encode(public_key), "validator added");
        Ok(())
    }

    pub fn remove_validator(
        &self,
        caller: &BridgeAddress,
        chain: ChainId,
        public_key: &ValidatorPublicKeyBytes,
    ) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_committee(chain, |members, _| {
            let before = members.len();
            members.retain(|m| &m.public_key != public_key);
            if members.len() == before {
                return Err(BridgeError::ConfigError(
                    "validator is not in the committee".to_string(),
                ));
            }
            Ok(())
        })?;
        info!(admin = %caller, %chain, validator = %hex::encode(public_key), "validator removed");
        Ok(())
    }

    /// Raise or lower the quorum threshold for `chain`. A threshold above
    /// the member count is allowed and fails closed.
    pub fn set_min_validators(
        &self,
        caller: &BridgeAddress,
        chain: ChainId,
        min_validators: u16,
    ) -> BridgeResult<()> {
        self.ensure_admin(caller)?;
        self.update_committee(chain, |_, threshold| {
            *threshold = min_validators;
            Ok(())
        })
    }
}
