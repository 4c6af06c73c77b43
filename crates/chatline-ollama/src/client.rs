// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Ollama native API.
//!
//! Provides [`OllamaClient`] which handles request construction, NDJSON
//! streaming for `/api/chat`, one-shot `/api/generate` calls, and the
//! `/api/tags` liveness check.

use std::time::Duration;

use chatline_config::model::OllamaConfig;
use chatline_core::{ChatlineError, DeltaStream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ndjson;
use crate::types::{ApiErrorResponse, ChatRequest, GenerateRequest, GenerateResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for one Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Creates a client. The read timeout bounds the gap between body
    /// chunks, not the length of a whole streamed reply.
    pub fn new(config: &OllamaConfig) -> Result<Self, ChatlineError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ChatlineError::Backend {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Starts a streaming chat and returns its text deltas.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        stop: CancellationToken,
    ) -> Result<DeltaStream, ChatlineError> {
        let mut req = request.clone();
        req.stream = true;

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&req)
            .send()
            .await
            .map_err(|e| ChatlineError::Backend {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = req.model.as_str(), "chat stream response received");
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(ndjson::decode_deltas(response.bytes_stream(), stop))
    }

    /// Sends a non-streaming generate request and returns the full text.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String, ChatlineError> {
        let mut req = request.clone();
        req.stream = false;

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&req)
            .send()
            .await
            .map_err(|e| ChatlineError::Backend {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = req.model.as_str(), "generate response received");
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await.map_err(|e| ChatlineError::Backend {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| ChatlineError::Backend {
                message: format!("failed to parse generate response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.response)
    }

    /// Checks the server is reachable.
    pub async fn ping(&self) -> Result<(), ChatlineError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| ChatlineError::Backend {
                message: format!("ollama unreachable: {e}"),
                source: Some(Box::new(e)),
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

async fn error_from_response(response: reqwest::Response) -> ChatlineError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_err) => format!("ollama API error ({status}): {}", api_err.error),
        Err(_) => format!("API returned {status}: {body}"),
    };
    ChatlineError::backend(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = OllamaConfig {
            base_url: "http://localhost:11434/".into(),
            ..OllamaConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.url("/api/chat"), "http://localhost:11434/api/chat");
    }
}
