// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits for the collaborators the pipeline talks to.
//!
//! Backend and store adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod backend;
pub mod history;
pub mod telemetry;

pub use adapter::PluginAdapter;
pub use backend::{ClassificationBackend, DeltaStream, GenerationBackend};
pub use history::HistoryStore;
pub use telemetry::TelemetrySink;
