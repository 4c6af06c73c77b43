// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry sink that keeps every report for assertions.

use std::sync::Mutex;
use std::time::Duration;

use chatline_core::{RequestReport, TelemetrySink};

/// Collects [`RequestReport`]s in arrival order.
#[derive(Default)]
pub struct RecordingTelemetry {
    reports: Mutex<Vec<RequestReport>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<RequestReport> {
        self.reports
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` reports arrived, or `timeout` passes.
    ///
    /// Reports are recorded after the final chunk is sent, so a test that
    /// has just drained a stream may need to wait briefly.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<RequestReport> {
        let _ = tokio::time::timeout(timeout, async {
            while self.len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        self.reports()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&self, report: &RequestReport) {
        self.reports
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(report.clone());
    }
}
