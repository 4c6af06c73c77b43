// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama native API request/response types.

use chatline_config::model::OllamaConfig;
use serde::{Deserialize, Serialize};

/// Sampling and runtime options sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub num_predict: u32,
    /// Context window size.
    pub num_ctx: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub num_thread: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl ModelOptions {
    /// Options for one call: per-call budget on top of the configured sampling.
    pub fn new(config: &OllamaConfig, temperature: f32, num_predict: u32, num_ctx: u32) -> Self {
        Self {
            temperature,
            num_predict,
            num_ctx,
            top_k: config.top_k,
            top_p: config.top_p,
            repeat_penalty: config.repeat_penalty,
            num_thread: config.num_thread,
            stop: config.stop.clone(),
        }
    }
}

/// One message of a `/api/chat` conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ModelOptions,
}

/// One NDJSON line of a streaming `/api/chat` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request body for `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: ModelOptions,
}

/// Non-streaming `/api/generate` response.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
}
