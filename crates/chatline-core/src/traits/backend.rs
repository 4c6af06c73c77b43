// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model backend traits for generation and classification.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::ChatlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GenerationRequest, InferenceParams};

/// Ordered text deltas produced by a generation backend.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatlineError>> + Send>>;

/// A backend that streams a reply for a prepared prompt.
#[async_trait]
pub trait GenerationBackend: PluginAdapter {
    /// Starts a generation and returns its delta stream.
    ///
    /// Cancelling `stop` asks the backend to end the stream early. Honouring it
    /// is best-effort; callers must not rely on the stream ending promptly.
    async fn generate(
        &self,
        request: GenerationRequest,
        stop: CancellationToken,
    ) -> Result<DeltaStream, ChatlineError>;
}

/// A backend that answers a short, bounded, non-streaming prompt.
#[async_trait]
pub trait ClassificationBackend: PluginAdapter {
    async fn infer(&self, prompt: &str, params: &InferenceParams)
    -> Result<String, ChatlineError>;
}
