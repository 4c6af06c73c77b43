// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend adapters over [`OllamaClient`] and the pool connector.

use std::sync::Arc;

use async_trait::async_trait;
use chatline_config::model::OllamaConfig;
use chatline_core::{
    AdapterType, ChatlineError, ClassificationBackend, DeltaStream, GenerationBackend,
    GenerationRequest, HealthStatus, InferenceParams, PluginAdapter,
};
use chatline_pool::Connector;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::OllamaClient;
use crate::types::{ChatMessage, ChatRequest, GenerateRequest, ModelOptions};

/// Map a generation request onto an `/api/chat` body.
pub fn chat_request(config: &OllamaConfig, request: GenerationRequest) -> ChatRequest {
    let GenerationRequest {
        plan,
        system_prompt,
        history,
        user_text,
    } = request;

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system".to_string(),
        content: system_prompt,
    });
    messages.extend(history.into_iter().map(|turn| ChatMessage {
        role: turn.role.to_string(),
        content: turn.content,
    }));
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: user_text,
    });

    ChatRequest {
        options: ModelOptions::new(config, plan.temperature, plan.max_tokens, plan.context_window),
        model: plan.backend_id,
        messages,
        stream: true,
    }
}

async fn check_tags(client: &OllamaClient) -> Result<HealthStatus, ChatlineError> {
    match client.ping().await {
        Ok(()) => Ok(HealthStatus::Healthy),
        Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
    }
}

/// Streaming generation backend.
pub struct OllamaGenerator {
    client: OllamaClient,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PluginAdapter for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatlineError> {
        check_tags(&self.client).await
    }
}

#[async_trait]
impl GenerationBackend for OllamaGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
        stop: CancellationToken,
    ) -> Result<DeltaStream, ChatlineError> {
        let chat = chat_request(self.client.config(), request);
        self.client.chat_stream(&chat, stop).await
    }
}

/// One-shot classification backend.
pub struct OllamaClassifier {
    client: OllamaClient,
}

impl OllamaClassifier {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PluginAdapter for OllamaClassifier {
    fn name(&self) -> &str {
        "ollama"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Classification
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatlineError> {
        check_tags(&self.client).await
    }
}

#[async_trait]
impl ClassificationBackend for OllamaClassifier {
    async fn infer(
        &self,
        prompt: &str,
        params: &InferenceParams,
    ) -> Result<String, ChatlineError> {
        let request = GenerateRequest {
            model: params.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: ModelOptions::new(
                self.client.config(),
                params.temperature,
                params.max_tokens,
                params.context_window,
            ),
        };
        self.client.generate(&request).await
    }
}

/// Opens one HTTP client per pool slot.
pub struct OllamaConnector {
    config: OllamaConfig,
}

impl OllamaConnector {
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for OllamaConnector {
    type Handle = Arc<dyn GenerationBackend>;

    async fn connect(&self, slot: usize) -> Result<Self::Handle, ChatlineError> {
        let client = OllamaClient::new(&self.config)?;
        debug!(slot, base_url = client.base_url(), "ollama connection created");
        Ok(Arc::new(OllamaGenerator::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use chatline_core::{GenerationPlan, RouteTier, Turn};

    use super::*;

    #[test]
    fn chat_request_orders_system_history_user() {
        let request = GenerationRequest {
            plan: GenerationPlan {
                tier: RouteTier::General,
                backend_id: "llama3".into(),
                temperature: 0.7,
                max_tokens: 2048,
                context_window: 4096,
            },
            system_prompt: "be nice".into(),
            history: vec![Turn::user("earlier"), Turn::assistant("reply")],
            user_text: "now".into(),
        };
        let chat = chat_request(&OllamaConfig::default(), request);
        let roles: Vec<&str> = chat.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(chat.messages[3].content, "now");
        assert_eq!(chat.model, "llama3");
        assert_eq!(chat.options.temperature, 0.7);
        assert_eq!(chat.options.num_predict, 2048);
        assert_eq!(chat.options.num_ctx, 4096);
        assert!(chat.stream);
    }
}
