// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chatline integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockGenerationBackend`] - Scripted delta streams with stop tracking
//! - [`MockClassificationBackend`] - Fixed-label classifier with call counter
//! - [`MockHistoryStore`] - History store with failure injection
//! - [`TestHarness`] - A fully wired orchestrator over the mocks

pub mod harness;
pub mod mock_backend;
pub mod mock_history;
pub mod telemetry;

pub use harness::{TestHarness, TestHarnessBuilder, reply_text};
pub use mock_backend::{Ending, MockClassificationBackend, MockGenerationBackend, SharedConnector};
pub use mock_history::MockHistoryStore;
pub use telemetry::RecordingTelemetry;
