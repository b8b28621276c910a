// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Request handler behind the HTTP routes. The trait seam keeps the router
//! testable against a stub and the engine free of axum types.

use crate::config::{BridgeLimitsConfig, UserLimits};
use crate::engine::{BridgeEngine, TransferProof};
use crate::error::{BridgeError, BridgeResult};
use crate::limiter::{SECONDS_PER_DAY, SECONDS_PER_WEEK};
use crate::utils::current_time_secs;
use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_bridge_types::{
    BridgeAddress, BridgeMessage, ChainId, CommitteeMember, TokenId, TransferId, TransferRecord,
    TransferStatus, ValidatorCommittee, ValidatorPublicKeyBytes,
};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::sync::Arc;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitiateTransferRequest {
    pub caller: BridgeAddress,
    pub recipient: BridgeAddress,
    pub token: TokenId,
    pub amount: u64,
    pub target_chain: ChainId,
    pub nonce: u64,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompleteTransferRequest {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub transfer_id: TransferId,
    pub proof: TransferProof,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefundTransferRequest {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub transfer_id: TransferId,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RejectTransferRequest {
    pub caller: BridgeAddress,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub transfer_id: TransferId,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub caller: BridgeAddress,
    pub recipient: BridgeAddress,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub payload: Vec<u8>,
    pub target_chain: ChainId,
    pub nonce: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiveMessageRequest {
    pub message: BridgeMessage,
    pub proof: TransferProof,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceRequest {
    pub caller: BridgeAddress,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsUpdateRequest {
    pub caller: BridgeAddress,
    pub limits: BridgeLimitsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserLimitsUpdateRequest {
    pub caller: BridgeAddress,
    pub user: BridgeAddress,
    /// None clears the override and restores global defaults.
    pub limits: Option<UserLimits>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeeUpdateRequest {
    pub caller: BridgeAddress,
    pub fee_bps: u64,
    pub fee_collector: BridgeAddress,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitteeValidatorEntry {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: ValidatorPublicKeyBytes,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitteeUpdateRequest {
    pub caller: BridgeAddress,
    pub chain: ChainId,
    pub min_validators: u16,
    pub validators: Vec<CommitteeValidatorEntry>,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferRecordResponse {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub transfer_id: TransferId,
    pub sender: BridgeAddress,
    pub recipient: BridgeAddress,
    pub token: TokenId,
    pub amount: u64,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub created_at: u64,
    pub status: TransferStatus,
}

impl From<TransferRecord> for TransferRecordResponse {
    fn from(record: TransferRecord) -> Self {
        Self {
            transfer_id: record.id,
            sender: record.transfer.sender,
            recipient: record.transfer.recipient,
            token: record.transfer.token,
            amount: record.transfer.amount,
            source_chain: record.transfer.source_chain,
            target_chain: record.transfer.target_chain,
            created_at: record.created_at,
            status: record.status,
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageIdResponse {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub message_id: [u8; 32],
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsageResponse {
    pub user: BridgeAddress,
    pub transferred_today: u64,
    pub transferred_this_week: u64,
    pub last_large_transfer_at: Option<u64>,
    /// Start of the current day and week buckets, unix seconds.
    pub day_window_start: u64,
    pub week_window_start: u64,
}

#[async_trait]
pub trait BridgeRequestHandlerTrait {
    async fn initiate_transfer(&self, request: InitiateTransferRequest)
        -> BridgeResult<Response>;
    async fn complete_transfer(&self, request: CompleteTransferRequest)
        -> BridgeResult<Response>;
    async fn refund_transfer(&self, request: RefundTransferRequest) -> BridgeResult<Response>;
    async fn reject_transfer(&self, request: RejectTransferRequest) -> BridgeResult<Response>;
    async fn get_transfer(&self, id: TransferId) -> BridgeResult<Response>;
    async fn send_message(&self, request: SendMessageRequest) -> BridgeResult<Response>;
    async fn receive_message(&self, request: ReceiveMessageRequest) -> BridgeResult<Response>;
    async fn get_limits(&self, user: BridgeAddress) -> BridgeResult<Response>;
    async fn get_usage(&self, user: BridgeAddress) -> BridgeResult<Response>;
    async fn pause(&self, request: GovernanceRequest) -> BridgeResult<Response>;
    async fn unpause(&self, request: GovernanceRequest) -> BridgeResult<Response>;
    async fn update_limits(&self, request: LimitsUpdateRequest) -> BridgeResult<Response>;
    async fn update_user_limits(&self, request: UserLimitsUpdateRequest)
        -> BridgeResult<Response>;
    async fn update_fee(&self, request: FeeUpdateRequest) -> BridgeResult<Response>;
    async fn update_committee(&self, request: CommitteeUpdateRequest) -> BridgeResult<Response>;
}

pub struct BridgeRequestHandler {
    engine: Arc<BridgeEngine>,
}

impl BridgeRequestHandler {
    pub fn new(engine: Arc<BridgeEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl BridgeRequestHandlerTrait for BridgeRequestHandler {
    async fn initiate_transfer(
        &self,
        request: InitiateTransferRequest,
    ) -> BridgeResult<Response> {
        let record = self
            .engine
            .initiate_transfer(
                &request.caller,
                request.recipient,
                request.token,
                request.amount,
                request.target_chain,
                request.nonce,
            )
            .await?;
        Ok(Json(TransferRecordResponse::from(record)).into_response())
    }

    async fn complete_transfer(
        &self,
        request: CompleteTransferRequest,
    ) -> BridgeResult<Response> {
        let record = self
            .engine
            .complete_transfer(request.transfer_id, &request.proof)
            .await?;
        Ok(Json(TransferRecordResponse::from(record)).into_response())
    }

    async fn refund_transfer(&self, request: RefundTransferRequest) -> BridgeResult<Response> {
        let record = self.engine.refund_expired(request.transfer_id).await?;
        Ok(Json(TransferRecordResponse::from(record)).into_response())
    }

    async fn reject_transfer(&self, request: RejectTransferRequest) -> BridgeResult<Response> {
        let record = self
            .engine
            .reject_transfer_at(&request.caller, request.transfer_id, current_time_secs())
            .await?;
        Ok(Json(TransferRecordResponse::from(record)).into_response())
    }

    async fn get_transfer(&self, id: TransferId) -> BridgeResult<Response> {
        let record = self
            .engine
            .transfer_record(&id)
            .ok_or(BridgeError::UnknownTransfer(id))?;
        Ok(Json(TransferRecordResponse::from(record)).into_response())
    }

    async fn send_message(&self, request: SendMessageRequest) -> BridgeResult<Response> {
        let message_id = self.engine.send_message(
            &request.caller,
            request.recipient,
            request.payload,
            request.target_chain,
            request.nonce,
        )?;
        Ok(Json(MessageIdResponse { message_id }).into_response())
    }

    async fn receive_message(&self, request: ReceiveMessageRequest) -> BridgeResult<Response> {
        let message_id = self
            .engine
            .receive_message(request.message, &request.proof)?;
        Ok(Json(MessageIdResponse { message_id }).into_response())
    }

    async fn get_limits(&self, user: BridgeAddress) -> BridgeResult<Response> {
        let effective = self.engine.params().effective_limits(&user);
        Ok(Json(serde_json::json!({
            "user": user,
            "max-per-transfer": effective.max_per_transfer,
            "daily-limit": effective.daily_limit,
            "weekly-limit": effective.weekly_limit,
            "large-transfer-threshold": effective.large_transfer_threshold,
            "cooldown-secs": effective.cooldown_secs,
        }))
        .into_response())
    }

    async fn get_usage(&self, user: BridgeAddress) -> BridgeResult<Response> {
        let now = current_time_secs();
        let limiter = self.engine.limiter();
        Ok(Json(UsageResponse {
            user,
            transferred_today: limiter.transferred_on_day(&user, now).await,
            transferred_this_week: limiter.transferred_in_week(&user, now).await,
            last_large_transfer_at: limiter.last_large_transfer_at(&user).await,
            day_window_start: now / SECONDS_PER_DAY * SECONDS_PER_DAY,
            week_window_start: now / SECONDS_PER_WEEK * SECONDS_PER_WEEK,
        })
        .into_response())
    }

    async fn pause(&self, request: GovernanceRequest) -> BridgeResult<Response> {
        self.engine.pause(&request.caller)?;
        Ok(Json(serde_json::json!({ "paused": true })).into_response())
    }

    async fn unpause(&self, request: GovernanceRequest) -> BridgeResult<Response> {
        self.engine.unpause(&request.caller)?;
        Ok(Json(serde_json::json!({ "paused": false })).into_response())
    }

    async fn update_limits(&self, request: LimitsUpdateRequest) -> BridgeResult<Response> {
        self.engine.update_limits(&request.caller, request.limits)?;
        Ok(Json(serde_json::json!({ "updated": true })).into_response())
    }

    async fn update_user_limits(
        &self,
        request: UserLimitsUpdateRequest,
    ) -> BridgeResult<Response> {
        match request.limits {
            Some(limits) => self
                .engine
                .set_user_limits(&request.caller, request.user, limits)?,
            None => self
                .engine
                .clear_user_limits(&request.caller, &request.user)?,
        }
        Ok(Json(serde_json::json!({ "updated": true })).into_response())
    }

    async fn update_fee(&self, request: FeeUpdateRequest) -> BridgeResult<Response> {
        self.engine
            .set_fee(&request.caller, request.fee_bps, request.fee_collector)?;
        Ok(Json(serde_json::json!({ "updated": true })).into_response())
    }

    async fn update_committee(&self, request: CommitteeUpdateRequest) -> BridgeResult<Response> {
        let members = request
            .validators
            .into_iter()
            .map(|v| CommitteeMember::new(v.public_key, v.name))
            .collect();
        let committee = ValidatorCommittee::new(members, request.min_validators)
            .map_err(|e| BridgeError::ConfigError(e.to_string()))?;
        self.engine
            .replace_committee(&request.caller, request.chain, committee)?;
        Ok(Json(serde_json::json!({ "updated": true })).into_response())
    }
}
