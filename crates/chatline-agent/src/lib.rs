// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request orchestration for the Chatline pipeline.
//!
//! The [`Orchestrator`] is the central coordinator that:
//! - Validates messages and short-circuits quick replies
//! - Looks up the response cache while loading history
//! - Classifies, plans and leases a generation backend on a miss
//! - Streams deltas back through a cancellable [`ResponseStream`]
//! - Reports a per-request performance trace to telemetry

pub mod emitter;
pub mod monitor;
pub mod orchestrator;
pub mod prompt;
pub mod shutdown;
pub mod state;
pub mod telemetry;

pub use emitter::{EmitError, Emitter, ResponseStream, StopHandle};
pub use monitor::{PerformanceTrace, checkpoints};
pub use orchestrator::{BackendPool, Collaborators, ComponentHealth, Orchestrator};
pub use prompt::{PromptBuilder, system_prompt};
pub use state::{RequestFsm, RequestState};
pub use telemetry::{TelemetryFanout, TracingTelemetry};
