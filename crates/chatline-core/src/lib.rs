// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chatline request pipeline.
//!
//! This crate provides the error taxonomy, request and stream types, and the
//! adapter traits for the collaborators the pipeline depends on (generation
//! and classification backends, the history store, telemetry sinks).

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ChatlineError, ErrorKind, ValidationError};
pub use types::{
    AdapterType, Category, Checkpoint, Classification, ClassificationSource, ConversationId,
    GenerationPlan, GenerationRequest, HealthStatus, IncomingMessage, InferenceParams, Language,
    LengthClass, MemoryMode, MessageDescriptor, RequestId, RequestReport, ResponsePath, Role,
    RouteTier, StreamChunk, Termination, Turn, UserId,
};

pub use traits::{
    ClassificationBackend, DeltaStream, GenerationBackend, HistoryStore, PluginAdapter,
    TelemetrySink,
};
