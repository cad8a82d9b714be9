//! Chat API handlers

use crate::api::models::{error_codes, ApiError};
use crate::chat::{ChatError, ChatOrchestrator, ChatRequest};
use crate::metrics::METRICS;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Application state for chat handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

/// Relay a chat completion
///
/// POST /api/v1/chat
///
/// On success the response body is the live fragment stream (plus the
/// trailing context block when a new summary was produced this call).
pub async fn complete_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let start = Instant::now();
    let request_id = Uuid::new_v4();

    info!(
        %request_id,
        turns = request.messages.len(),
        has_context = request.context.is_some(),
        "chat request"
    );

    // Validate request
    if request.messages.is_empty() {
        METRICS.record_chat("invalid");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                error_codes::INTERNAL,
                "messages cannot be empty",
            )),
        ));
    }

    let reply = match state.orchestrator.run(request).await {
        Ok(reply) => reply,
        Err(e) => return Err(chat_error_response(request_id, e)),
    };

    METRICS.record_chat("success");
    METRICS
        .chat_request_duration
        .with_label_values(&[reply.path()])
        .observe(start.elapsed().as_secs_f64());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from_stream(reply.stream))
        .map_err(|e| {
            error!(%request_id, "failed to build streaming response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(error_codes::INTERNAL, e.to_string())),
            )
        })
}

/// Map the chat failure taxonomy to caller-visible responses
fn chat_error_response(request_id: Uuid, err: ChatError) -> (StatusCode, Json<ApiError>) {
    match err {
        ChatError::OversizedTurn => {
            METRICS.record_chat("oversized_turn");
            (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(error_codes::OVERSIZED_TURN, err.to_string())),
            )
        }
        ChatError::AuthRejected => {
            METRICS.record_chat("auth_rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new(error_codes::UPSTREAM_AUTH, err.to_string())),
            )
        }
        ChatError::Upstream(message) => {
            METRICS.record_chat("upstream_error");
            error!(%request_id, "chat request failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(error_codes::INTERNAL, message)),
            )
        }
    }
}

/// Liveness probe
///
/// GET /api/v1/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus text exposition
///
/// GET /metrics
pub async fn export_metrics() -> String {
    METRICS.export_prometheus()
}
