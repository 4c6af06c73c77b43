// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chatline pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Rejection reasons produced by the preprocessor before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The message is empty or whitespace only.
    #[error("message content cannot be empty")]
    Empty,

    /// The message exceeds the configured maximum length.
    #[error("message content too long ({length} characters, limit is {max})")]
    TooLong { length: usize, max: usize },
}

/// The primary error type used across Chatline adapter traits and pipeline stages.
#[derive(Debug, Error)]
pub enum ChatlineError {
    /// Configuration errors (invalid values, unusable settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// The inbound message was rejected by the preprocessor.
    #[error("invalid message: {0}")]
    Validation(#[from] ValidationError),

    /// Every pooled backend connection stayed busy for the whole acquire window.
    #[error("all backend connections are busy (waited {waited:?})")]
    BackendBusy { waited: Duration },

    /// Model backend errors (HTTP failure, malformed stream, model not found).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The classification backend produced no usable label.
    #[error("classification failed: {message}")]
    Classification { message: String },

    /// History store errors.
    #[error("history store error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatlineError {
    /// Shorthand for a backend error without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        ChatlineError::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// The user-facing category this error is reported under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatlineError::Validation(_) => ErrorKind::Validation,
            ChatlineError::BackendBusy { .. } => ErrorKind::BackendBusy,
            ChatlineError::Backend { .. } | ChatlineError::Timeout { .. } => ErrorKind::Generation,
            ChatlineError::Config(_)
            | ChatlineError::Classification { .. }
            | ChatlineError::Storage { .. }
            | ChatlineError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller may resubmit the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// User-visible error categories carried by terminal stream chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or empty input. The user must resubmit.
    Validation,
    /// Backend pool exhausted. Retryable.
    BackendBusy,
    /// Backend failed mid-generation. Not retried automatically.
    Generation,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::BackendBusy)
    }
}
