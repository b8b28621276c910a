// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface of the bridge node: transfer and message operations,
//! governance, queries, health and metrics.

pub mod handler;

use crate::error::BridgeError;
use crate::metrics::BridgeMetrics;
use axum::extract::{MatchedPath, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use handler::{
    BridgeRequestHandlerTrait, CommitteeUpdateRequest, CompleteTransferRequest, FeeUpdateRequest,
    GovernanceRequest, InitiateTransferRequest, LimitsUpdateRequest, ReceiveMessageRequest,
    RefundTransferRequest, RejectTransferRequest, SendMessageRequest, UserLimitsUpdateRequest,
};

pub const APPLICATION_JSON: &str = "application/json";

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<dyn BridgeRequestHandlerTrait + Send + Sync>,
    pub registry: Registry,
    pub metrics: Arc<BridgeMetrics>,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            BridgeError::InvalidAddress(_)
            | BridgeError::InvalidAmount
            | BridgeError::UnknownToken(_)
            | BridgeError::UnknownChain(_)
            | BridgeError::SameChainTransfer
            | BridgeError::InsufficientBalance
            | BridgeError::DuplicateTransfer(_)
            | BridgeError::ConfigError(_) => StatusCode::BAD_REQUEST,
            BridgeError::BridgePaused => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::ExceedsMaxTransfer { .. }
            | BridgeError::ExceedsDailyLimit { .. }
            | BridgeError::ExceedsWeeklyLimit { .. }
            | BridgeError::CooldownNotElapsed { .. } => StatusCode::TOO_MANY_REQUESTS,
            BridgeError::UnauthorizedProof(_) => StatusCode::UNAUTHORIZED,
            BridgeError::Unauthorized(_) => StatusCode::FORBIDDEN,
            BridgeError::AlreadyProcessed(_) => StatusCode::CONFLICT,
            BridgeError::UnknownTransfer(_) => StatusCode::NOT_FOUND,
            BridgeError::TransferExpired(_) | BridgeError::NotRefundable(_) => StatusCode::GONE,
            BridgeError::InsolvencyViolation { .. } | BridgeError::Generic(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({
            "error": self.reason_label(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub fn make_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/metrics", get(metrics))
        .route("/transfer/initiate", post(initiate_transfer))
        .route("/transfer/complete", post(complete_transfer))
        .route("/transfer/refund", post(refund_transfer))
        .route("/transfer/:id", get(get_transfer))
        .route("/message/send", post(send_message))
        .route("/message/receive", post(receive_message))
        .route("/limits/:user", get(get_limits))
        .route("/usage/:user", get(get_usage))
        .route("/admin/pause", post(pause))
        .route("/admin/unpause", post(unpause))
        .route("/admin/limits", post(update_limits))
        .route("/admin/user-limits", post(update_user_limits))
        .route("/admin/fee", post(update_fee))
        .route("/admin/committee", post(update_committee))
        .route("/admin/reject", post(reject_transfer))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_request,
        ))
        .with_state(state)
}

async fn track_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    // The matched route template keeps label cardinality bounded.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    state
        .metrics
        .server_requests
        .with_label_values(&[&route])
        .inc();
    next.run(request).await
}

pub async fn run_server(socket_address: &SocketAddr, state: AppState) -> anyhow::Result<()> {
    info!(%socket_address, "bridge server listening");
    let listener = tokio::net::TcpListener::bind(socket_address).await?;
    axum::serve(listener, make_router(state)).await?;
    Ok(())
}

async fn ping() -> &'static str {
    "pong"
}

async fn metrics(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&state.registry.gather(), &mut buffer).is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to encode metrics",
        )
            .into_response();
    }
    ([(header::CONTENT_TYPE, encoder.format_type())], buffer).into_response()
}

fn parse_hex_id(raw: &str) -> Result<[u8; 32], Response> {
    let bytes = hex::decode(raw.trim_start_matches("0x")).map_err(|_| {
        (StatusCode::BAD_REQUEST, "id must be hex").into_response()
    })?;
    bytes
        .try_into()
        .map_err(|_| (StatusCode::BAD_REQUEST, "id must be 32 bytes").into_response())
}

async fn initiate_transfer(
    State(state): State<AppState>,
    Json(request): Json<InitiateTransferRequest>,
) -> Result<Response, BridgeError> {
    state.handler.initiate_transfer(request).await
}

async fn complete_transfer(
    State(state): State<AppState>,
    Json(request): Json<CompleteTransferRequest>,
) -> Result<Response, BridgeError> {
    state.handler.complete_transfer(request).await
}

async fn refund_transfer(
    State(state): State<AppState>,
    Json(request): Json<RefundTransferRequest>,
) -> Result<Response, BridgeError> {
    state.handler.refund_transfer(request).await
}

async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, Response> {
    let id = parse_hex_id(&id)?;
    state.handler.get_transfer(id).await.map_err(|e| e.into_response())
}

async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Response, BridgeError> {
    state.handler.send_message(request).await
}

async fn receive_message(
    State(state): State<AppState>,
    Json(request): Json<ReceiveMessageRequest>,
) -> Result<Response, BridgeError> {
    state.handler.receive_message(request).await
}

async fn get_limits(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Response, Response> {
    let user = user
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "bad address").into_response())?;
    state.handler.get_limits(user).await.map_err(|e| e.into_response())
}

async fn get_usage(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Response, Response> {
    let user = user
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "bad address").into_response())?;
    state.handler.get_usage(user).await.map_err(|e| e.into_response())
}

async fn pause(
    State(state): State<AppState>,
    Json(request): Json<GovernanceRequest>,
) -> Result<Response, BridgeError> {
    state.handler.pause(request).await
}

async fn unpause(
    State(state): State<AppState>,
    Json(request): Json<GovernanceRequest>,
) -> Result<Response, BridgeError> {
    state.handler.unpause(request).await
}

async fn update_limits(
    State(state): State<AppState>,
    Json(request): Json<LimitsUpdateRequest>,
) -> Result<Response, BridgeError> {
    state.handler.update_limits(request).await
}

async fn update_user_limits(
    State(state): State<AppState>,
    Json(request): Json<UserLimitsUpdateRequest>,
) -> Result<Response, BridgeError> {
    state.handler.update_user_limits(request).await
}

async fn update_fee(
    State(state): State<AppState>,
    Json(request): Json<FeeUpdateRequest>,
) -> Result<Response, BridgeError> {
    state.handler.update_fee(request).await
}

async fn update_committee(
    State(state): State<AppState>,
    Json(request): Json<CommitteeUpdateRequest>,
) -> Result<Response, BridgeError> {
    state.handler.update_committee(request).await
}

async fn reject_transfer(
    State(state): State<AppState>,
    Json(request): Json<RejectTransferRequest>,
) -> Result<Response, BridgeError> {
    state.handler.reject_transfer(request).await
}
