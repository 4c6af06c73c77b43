// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock model backends for deterministic testing.
//!
//! [`MockGenerationBackend`] streams scripted deltas and records every request
//! and stop token it receives. [`MockClassificationBackend`] answers with a
//! fixed label. Both count calls and can be told to fail.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio_util::sync::CancellationToken;

use chatline_core::{
    AdapterType, ChatlineError, ClassificationBackend, DeltaStream, GenerationBackend,
    GenerationRequest, HealthStatus, InferenceParams, PluginAdapter,
};
use chatline_pool::Connector;

/// What happens after the scripted deltas run out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ending {
    /// The stream ends normally.
    Complete,
    /// The stream yields one error.
    Fail(String),
    /// The stream waits until stopped.
    Hang,
}

#[derive(Debug, Clone)]
struct Script {
    deltas: Vec<String>,
    ending: Ending,
    fail_on_start: Option<String>,
    start_delay: Duration,
    delay: Duration,
}

struct ScriptState {
    deltas: VecDeque<String>,
    ending: Option<Ending>,
    delay: Duration,
    stop: CancellationToken,
}

/// A generation backend that streams pre-configured deltas.
pub struct MockGenerationBackend {
    script: Mutex<Script>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
    stops: Mutex<Vec<CancellationToken>>,
}

impl MockGenerationBackend {
    /// Streams "mock " then "response".
    pub fn new() -> Self {
        Self::with_deltas(&["mock ", "response"])
    }

    pub fn with_deltas(deltas: &[&str]) -> Self {
        Self {
            script: Mutex::new(Script {
                deltas: deltas.iter().map(|d| d.to_string()).collect(),
                ending: Ending::Complete,
                fail_on_start: None,
                start_delay: Duration::ZERO,
                delay: Duration::ZERO,
            }),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            stops: Mutex::new(Vec::new()),
        }
    }

    /// Wait `delay` before each delta.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.script_mut(|s| s.delay = delay);
        self
    }

    /// Wait `delay` before `generate` returns its stream.
    pub fn with_start_delay(self, delay: Duration) -> Self {
        self.script_mut(|s| s.start_delay = delay);
        self
    }

    pub fn ending_with(self, ending: Ending) -> Self {
        self.script_mut(|s| s.ending = ending);
        self
    }

    /// Fail `generate` itself instead of returning a stream.
    pub fn failing_on_start(self, message: &str) -> Self {
        let message = message.to_string();
        self.script_mut(|s| s.fail_on_start = Some(message));
        self
    }

    /// Replace the scripted deltas for subsequent calls.
    pub fn set_deltas(&self, deltas: &[&str]) {
        let deltas = deltas.iter().map(|d| d.to_string()).collect();
        self.script_mut(|s| s.deltas = deltas);
    }

    fn script_mut(&self, f: impl FnOnce(&mut Script)) {
        let mut script = self.script.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut script);
    }

    /// Number of `generate` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Whether the stop token of any call has been cancelled.
    pub fn stop_requested(&self) -> bool {
        self.stops
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .any(CancellationToken::is_cancelled)
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGenerationBackend {
    fn name(&self) -> &str {
        "mock-generation"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatlineError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(
        &self,
        request: GenerationRequest,
        stop: CancellationToken,
    ) -> Result<DeltaStream, ChatlineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request);
        self.stops
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(stop.clone());

        let script = self
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        if let Some(message) = script.fail_on_start {
            return Err(ChatlineError::backend(message));
        }
        if !script.start_delay.is_zero() {
            tokio::time::sleep(script.start_delay).await;
        }

        let state = ScriptState {
            deltas: script.deltas.into(),
            ending: Some(script.ending),
            delay: script.delay,
            stop,
        };
        Ok(Box::pin(stream::unfold(state, |mut state| async move {
            if state.stop.is_cancelled() {
                return None;
            }
            if let Some(text) = state.deltas.pop_front() {
                if !state.delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = state.stop.cancelled() => return None,
                        _ = tokio::time::sleep(state.delay) => {}
                    }
                }
                return Some((Ok(text), state));
            }
            match state.ending.take() {
                None | Some(Ending::Complete) => None,
                Some(Ending::Fail(message)) => Some((Err(ChatlineError::backend(message)), state)),
                Some(Ending::Hang) => {
                    state.stop.cancelled().await;
                    None
                }
            }
        })))
    }
}

/// Hands out the same generation backend for every pool slot.
pub struct SharedConnector {
    backend: Arc<MockGenerationBackend>,
    connects: AtomicUsize,
}

impl SharedConnector {
    pub fn new(backend: Arc<MockGenerationBackend>) -> Self {
        Self {
            backend,
            connects: AtomicUsize::new(0),
        }
    }

    /// Number of handles created, including recreations.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for SharedConnector {
    type Handle = Arc<dyn GenerationBackend>;

    async fn connect(&self, _slot: usize) -> Result<Self::Handle, ChatlineError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.backend.clone() as Arc<dyn GenerationBackend>)
    }
}

/// A classification backend that answers with a fixed label.
pub struct MockClassificationBackend {
    label: String,
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockClassificationBackend {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("general")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl Default for MockClassificationBackend {
    fn default() -> Self {
        Self::new("general")
    }
}

#[async_trait]
impl PluginAdapter for MockClassificationBackend {
    fn name(&self) -> &str {
        "mock-classification"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Classification
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatlineError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ClassificationBackend for MockClassificationBackend {
    async fn infer(
        &self,
        prompt: &str,
        _params: &InferenceParams,
    ) -> Result<String, ChatlineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ChatlineError::backend("mock classification failure"));
        }
        Ok(self.label.clone())
    }
}

#[cfg(test)]
mod tests {
    use chatline_core::{GenerationPlan, RouteTier};
    use futures::StreamExt;

    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            plan: GenerationPlan {
                tier: RouteTier::Simple,
                backend_id: "mock".into(),
                temperature: 0.5,
                max_tokens: 16,
                context_window: 64,
            },
            system_prompt: String::new(),
            history: Vec::new(),
            user_text: "hi".into(),
        }
    }

    #[tokio::test]
    async fn default_script_streams_mock_response() {
        let backend = MockGenerationBackend::new();
        let stream = backend
            .generate(request(), CancellationToken::new())
            .await
            .unwrap();
        let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;
        assert_eq!(deltas.concat(), "mock response");
        assert_eq!(backend.calls(), 1);
        assert_eq!(backend.requests()[0].user_text, "hi");
    }

    #[tokio::test]
    async fn failing_ending_yields_one_error() {
        let backend = MockGenerationBackend::with_deltas(&["a"])
            .ending_with(Ending::Fail("boom".into()));
        let stream = backend
            .generate(request(), CancellationToken::new())
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn hang_ends_when_stopped() {
        let backend = MockGenerationBackend::with_deltas(&[]).ending_with(Ending::Hang);
        let stop = CancellationToken::new();
        let mut stream = backend.generate(request(), stop.clone()).await.unwrap();
        let canceller = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        assert!(stream.next().await.is_none());
        assert!(backend.stop_requested());
    }

    #[tokio::test]
    async fn classification_counts_calls() {
        let backend = MockClassificationBackend::new("code");
        let params = InferenceParams {
            model: "m".into(),
            temperature: 0.1,
            max_tokens: 10,
            context_window: 512,
        };
        assert_eq!(backend.infer("p", &params).await.unwrap(), "code");
        assert!(MockClassificationBackend::failing().infer("p", &params).await.is_err());
        assert_eq!(backend.calls(), 1);
        assert_eq!(backend.prompts(), vec!["p".to_string()]);
    }
}
