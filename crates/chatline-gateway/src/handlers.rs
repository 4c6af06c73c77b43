// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles GET /api/health, POST /api/chat/{request_id}/stop,
//! POST /api/clear-cache and GET /metrics. The streaming chat endpoint lives
//! in [`crate::sse`].

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use chatline_core::{
    ChatlineError, ConversationId, ErrorKind, HealthStatus, IncomingMessage, Language, MemoryMode,
    RequestId, Turn, UserId,
};

use crate::server::GatewayState;

/// Request body for POST /api/chat/stream.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Message text.
    pub message: String,
    #[serde(default)]
    pub lang: Language,
    #[serde(default)]
    pub memory_type: MemoryMode,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Conversation to continue. Its messages are used as context when the
    /// history store has nothing for the id.
    #[serde(default)]
    pub conversation: Option<ConversationBody>,
}

/// A client-side conversation.
#[derive(Debug, Default, Deserialize)]
pub struct ConversationBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub messages: Vec<Turn>,
}

/// Build the pipeline message from transport fields.
pub(crate) fn incoming_message(
    text: String,
    lang: Language,
    memory_type: MemoryMode,
    user_id: Option<String>,
    conversation: Option<ConversationBody>,
) -> IncomingMessage {
    let conversation = conversation.unwrap_or_default();
    let mut message = IncomingMessage::new(text)
        .with_language(lang)
        .with_memory_mode(memory_type)
        .with_context(conversation.messages);
    if let Some(user_id) = user_id {
        message.user_id = UserId(user_id);
    }
    message.conversation_id = conversation.id.map(ConversationId);
    message
}

impl ChatRequest {
    pub fn into_message(self) -> IncomingMessage {
        incoming_message(
            self.message,
            self.lang,
            self.memory_type,
            self.user_id,
            self.conversation,
        )
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
    pub retryable: bool,
}

/// Map a pipeline error to an HTTP response.
pub fn error_response(error: &ChatlineError) -> Response {
    let kind = error.kind();
    let status = match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::BackendBusy => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Generation => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            kind,
            retryable: kind.is_retryable(),
        }),
    )
        .into_response()
}

/// Response body for GET /api/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when every component is healthy, "degraded" otherwise.
    pub status: String,
    pub message: String,
    pub version: String,
    pub uptime_secs: u64,
    pub in_flight: usize,
    pub pool: PoolHealth,
    pub cache: CacheHealth,
    pub components: Vec<ComponentInfo>,
}

#[derive(Debug, Serialize)]
pub struct PoolHealth {
    pub capacity: usize,
    pub in_use: usize,
    pub acquisitions: u64,
    pub busy_rejections: u64,
    pub recreated: u64,
}

#[derive(Debug, Serialize)]
pub struct CacheHealth {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Serialize)]
pub struct ComponentInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub adapter_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn describe(status: HealthStatus) -> (String, Option<String>) {
    match status {
        HealthStatus::Healthy => ("healthy".to_string(), None),
        HealthStatus::Degraded(detail) => ("degraded".to_string(), Some(detail)),
        HealthStatus::Unhealthy(detail) => ("unhealthy".to_string(), Some(detail)),
    }
}

/// GET /api/health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;
    let components: Vec<ComponentInfo> = orchestrator
        .component_health()
        .await
        .into_iter()
        .map(|c| {
            let (status, detail) = describe(c.status);
            ComponentInfo {
                name: c.name,
                adapter_type: c.adapter_type.to_string(),
                status,
                detail,
            }
        })
        .collect();
    let healthy = components.iter().all(|c| c.status == "healthy");

    let pool = orchestrator.pool_stats();
    let cache = orchestrator.cache_stats();
    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        message: "Server is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        in_flight: orchestrator.in_flight(),
        pool: PoolHealth {
            capacity: pool.capacity,
            in_use: pool.in_use,
            acquisitions: pool.acquisitions,
            busy_rejections: pool.busy_rejections,
            recreated: pool.recreated,
        },
        cache: CacheHealth {
            entries: cache.entries,
            capacity: cache.capacity,
            hits: cache.hits,
            misses: cache.misses,
            evictions: cache.evictions,
        },
        components,
    })
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub request_id: String,
    pub stopped: bool,
}

/// POST /api/chat/{request_id}/stop
///
/// 404 when the request is unknown or already finished.
pub async fn post_stop(
    State(state): State<GatewayState>,
    Path(request_id): Path<String>,
) -> Response {
    let stopped = state.orchestrator.stop(&RequestId(request_id.clone()));
    let status = if stopped {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (
        status,
        Json(StopResponse {
            request_id,
            stopped,
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub status: String,
    pub cleared: usize,
}

/// POST /api/clear-cache
pub async fn post_clear_cache(State(state): State<GatewayState>) -> Json<ClearCacheResponse> {
    let cleared = state.orchestrator.clear_cache();
    Json(ClearCacheResponse {
        status: "ok".to_string(),
        cleared,
    })
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter disabled").into_response(),
    }
}
