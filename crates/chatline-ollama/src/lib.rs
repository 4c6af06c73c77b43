// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama native backend adapter for Chatline.
//!
//! Generation streams `/api/chat` as NDJSON. Classification is a single
//! non-streaming `/api/generate` call. [`OllamaConnector`] opens one client
//! per connection pool slot.

pub mod backend;
pub mod client;
pub mod ndjson;
pub mod types;

pub use backend::{OllamaClassifier, OllamaConnector, OllamaGenerator, chat_request};
pub use client::OllamaClient;
