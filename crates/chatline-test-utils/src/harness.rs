// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles a complete orchestrator with mock backends, a mock
//! history store, a real cache and a real connection pool. Provides `send()`
//! to drive the full pipeline in tests.

use std::sync::Arc;
use std::time::Duration;

use chatline_agent::{BackendPool, Collaborators, Orchestrator};
use chatline_cache::ResponseCache;
use chatline_config::model::ChatlineConfig;
use chatline_core::{ChatlineError, GenerationBackend, IncomingMessage, StreamChunk};
use chatline_pool::{ConnectionPool, Connector};
use futures::StreamExt;

use crate::mock_backend::{MockClassificationBackend, MockGenerationBackend, SharedConnector};
use crate::mock_history::MockHistoryStore;
use crate::telemetry::RecordingTelemetry;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: ChatlineConfig,
    generator: MockGenerationBackend,
    classifier: MockClassificationBackend,
    history: MockHistoryStore,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = ChatlineConfig::default();
        // Keep failure paths fast in tests.
        config.classifier.timeout_ms = 200;
        config.pool.acquire_timeout_ms = 500;
        config.generation.first_token_timeout_secs = 5;
        config.generation.idle_timeout_secs = 5;
        Self {
            config,
            generator: MockGenerationBackend::new(),
            classifier: MockClassificationBackend::default(),
            history: MockHistoryStore::new(),
        }
    }

    /// Adjust the configuration.
    pub fn with_config(mut self, adjust: impl FnOnce(&mut ChatlineConfig)) -> Self {
        adjust(&mut self.config);
        self
    }

    pub fn with_generator(mut self, generator: MockGenerationBackend) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_classifier(mut self, classifier: MockClassificationBackend) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_history(mut self, history: MockHistoryStore) -> Self {
        self.history = history;
        self
    }

    /// Build the harness, creating the pool, cache and orchestrator.
    pub async fn build(self) -> Result<TestHarness, ChatlineError> {
        let generator = Arc::new(self.generator);
        let classifier = Arc::new(self.classifier);
        let history = Arc::new(self.history);
        let telemetry = Arc::new(RecordingTelemetry::new());
        let connector = Arc::new(SharedConnector::new(Arc::clone(&generator)));

        let shared: Arc<dyn Connector<Handle = Arc<dyn GenerationBackend>>> = connector.clone();
        let pool: Arc<BackendPool> = Arc::new(ConnectionPool::new(shared, &self.config.pool).await?);
        let cache = Arc::new(ResponseCache::new(self.config.cache.capacity));

        let orchestrator = Arc::new(Orchestrator::new(
            &self.config,
            Collaborators {
                classification: classifier.clone(),
                pool: Arc::clone(&pool),
                cache: Arc::clone(&cache),
                history: history.clone(),
                telemetry: telemetry.clone(),
            },
        ));

        Ok(TestHarness {
            orchestrator,
            generator,
            classifier,
            history,
            telemetry,
            connector,
            pool,
            cache,
            config: self.config,
        })
    }
}

/// A complete pipeline with mock collaborators.
pub struct TestHarness {
    pub orchestrator: Arc<Orchestrator>,
    pub generator: Arc<MockGenerationBackend>,
    pub classifier: Arc<MockClassificationBackend>,
    pub history: Arc<MockHistoryStore>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub connector: Arc<SharedConnector>,
    pub pool: Arc<BackendPool>,
    pub cache: Arc<ResponseCache>,
    pub config: ChatlineConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Submit a message and collect every chunk of the response.
    pub async fn send(&self, message: IncomingMessage) -> Result<Vec<StreamChunk>, ChatlineError> {
        let stream = self.orchestrator.submit(message)?;
        Ok(stream.collect().await)
    }

    /// Submit plain text and return the concatenated reply.
    pub async fn send_text(&self, text: &str) -> Result<String, ChatlineError> {
        let chunks = self.send(IncomingMessage::new(text)).await?;
        Ok(reply_text(&chunks))
    }

    /// Wait for `count` telemetry reports.
    pub async fn reports(&self, count: usize) -> Vec<chatline_core::RequestReport> {
        self.telemetry.wait_for(count, Duration::from_secs(5)).await
    }
}

/// Concatenate the payloads of a chunk sequence.
pub fn reply_text(chunks: &[StreamChunk]) -> String {
    chunks.iter().map(|c| c.payload.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_round_trip() {
        let harness = TestHarness::builder().build().await.unwrap();
        let reply = harness
            .send_text("Tell me about the history of ancient Rome and its many emperors")
            .await
            .unwrap();
        assert_eq!(reply, "mock response");
        assert_eq!(harness.generator.calls(), 1);
        assert_eq!(harness.connector.connects(), 3);
    }
}
