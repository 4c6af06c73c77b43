// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry sink trait for finished request reports.

use crate::types::RequestReport;

/// Receives one report per finished request.
///
/// Called from the request task after the final chunk is sent, so
/// implementations must not block.
pub trait TelemetrySink: Send + Sync + 'static {
    fn record(&self, report: &RequestReport);
}
