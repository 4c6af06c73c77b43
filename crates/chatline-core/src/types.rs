// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the pipeline stages and adapter traits.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ErrorKind;

/// Identifies the owner of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl Default for UserId {
    fn default() -> Self {
        Self("anonymous".to_string())
    }
}

/// Identifies a stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Identifies a single in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Generation,
    Classification,
    History,
}

/// Author of a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One prior message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Reply language. Selects the system prompt and partitions the cache.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

/// How loaded history is windowed into the generation prompt.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemoryMode {
    /// Last N turns verbatim.
    #[default]
    Buffer,
    /// Digest of older turns plus the most recent ones verbatim.
    Summary,
    /// Newest turns that fit an estimated token budget.
    TokenBuffer,
}

/// A raw user message as received at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub text: String,
    /// Prior turns supplied by the client, oldest first.
    #[serde(default)]
    pub context: Vec<Turn>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub memory_mode: MemoryMode,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
}

impl IncomingMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: Vec::new(),
            language: Language::default(),
            memory_mode: MemoryMode::default(),
            user_id: UserId::default(),
            conversation_id: None,
        }
    }

    pub fn with_context(mut self, context: Vec<Turn>) -> Self {
        self.context = context;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_memory_mode(mut self, memory_mode: MemoryMode) -> Self {
        self.memory_mode = memory_mode;
        self
    }

    pub fn with_conversation(mut self, user_id: UserId, conversation_id: ConversationId) -> Self {
        self.user_id = user_id;
        self.conversation_id = Some(conversation_id);
        self
    }
}

/// Coarse length bucket of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LengthClass {
    Simple,
    Complex,
}

/// Lightweight facts derived from a message by the preprocessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    /// Trimmed message text.
    pub normalized_text: String,
    pub length_class: LengthClass,
    pub is_question: bool,
    pub is_code_request: bool,
    /// Canned reply when the message matches the quick-reply table.
    pub quick_reply: Option<String>,
}

/// Message category used to pick a backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Code,
    General,
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClassificationSource {
    Heuristic,
    BackendFallback,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub source: ClassificationSource,
}

/// Routing bucket produced by keyword dispatch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RouteTier {
    Simple,
    Code,
    General,
}

/// Concrete backend and sampling choice for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPlan {
    pub tier: RouteTier,
    pub backend_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub context_window: u32,
}

/// Parameters for a single non-streaming inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub context_window: u32,
}

/// Everything a generation backend needs to produce a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub plan: GenerationPlan,
    pub system_prompt: String,
    /// Windowed history, oldest first.
    pub history: Vec<Turn>,
    pub user_text: String,
}

/// How a response stream ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Cancelled,
    Failed { kind: ErrorKind, message: String },
}

impl Termination {
    pub fn is_success(&self) -> bool {
        matches!(self, Termination::Completed)
    }
}

/// One unit of streamed response output.
///
/// Non-final chunks carry text deltas. The single final chunk carries the
/// termination status and, on the quick-reply path, the canned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub payload: String,
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
}

impl StreamChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            payload: text.into(),
            is_final: false,
            termination: None,
        }
    }

    /// Final chunk that also carries text (quick replies).
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            payload: text.into(),
            is_final: true,
            termination: Some(Termination::Completed),
        }
    }

    pub fn completed() -> Self {
        Self::final_text(String::new())
    }

    pub fn cancelled() -> Self {
        Self {
            payload: String::new(),
            is_final: true,
            termination: Some(Termination::Cancelled),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            payload: String::new(),
            is_final: true,
            termination: Some(Termination::Failed {
                kind,
                message: message.into(),
            }),
        }
    }
}

/// Which branch of the decision tree answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponsePath {
    QuickReply,
    CacheHit,
    Generated,
}

/// A named point in a request's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    pub name: &'static str,
    pub elapsed: Duration,
}

/// Summary of a finished request handed to telemetry sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestReport {
    pub request_id: RequestId,
    pub path: Option<ResponsePath>,
    pub tier: Option<RouteTier>,
    pub termination: Termination,
    pub checkpoints: Vec<Checkpoint>,
    pub dropped_checkpoints: usize,
    pub total: Duration,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn incoming_message_defaults() {
        let msg: IncomingMessage = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(msg.language, Language::Fr);
        assert_eq!(msg.memory_mode, MemoryMode::Buffer);
        assert_eq!(msg.user_id, UserId("anonymous".into()));
        assert!(msg.context.is_empty());
        assert!(msg.conversation_id.is_none());
    }

    #[test]
    fn memory_mode_parses_snake_case() {
        assert_eq!(
            MemoryMode::from_str("token_buffer").unwrap(),
            MemoryMode::TokenBuffer
        );
        let json = serde_json::to_string(&MemoryMode::TokenBuffer).unwrap();
        assert_eq!(json, "\"token_buffer\"");
    }

    #[test]
    fn final_chunks_carry_termination() {
        assert!(StreamChunk::completed().is_final);
        assert!(!StreamChunk::delta("x").is_final);
        assert_eq!(
            StreamChunk::cancelled().termination,
            Some(Termination::Cancelled)
        );
        let failed = StreamChunk::failed(ErrorKind::BackendBusy, "busy");
        assert!(failed.payload.is_empty());
        assert!(!failed.termination.unwrap().is_success());
    }

    #[test]
    fn termination_serializes_tagged() {
        let t = Termination::Failed {
            kind: ErrorKind::Generation,
            message: "boom".into(),
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "generation");
    }

    #[test]
    fn route_tier_display() {
        assert_eq!(RouteTier::Code.to_string(), "code");
        assert_eq!(Category::from_str("general").unwrap(), Category::General);
    }
}
