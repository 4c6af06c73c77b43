// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock history store with call counters and failure injection.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use chatline_core::{
    AdapterType, ChatlineError, ConversationId, HealthStatus, HistoryStore, PluginAdapter, Turn,
    UserId,
};

/// An in-memory history store for assertions.
pub struct MockHistoryStore {
    conversations: Mutex<HashMap<ConversationId, Vec<Turn>>>,
    fail: AtomicBool,
    load_delay: Duration,
    loads: AtomicUsize,
    appends: AtomicUsize,
}

impl MockHistoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
            load_delay: Duration::ZERO,
            loads: AtomicUsize::new(0),
            appends: AtomicUsize::new(0),
        }
    }

    /// Seed a conversation.
    pub fn with_turns(self, conversation_id: &str, turns: Vec<Turn>) -> Self {
        self.conversations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(ConversationId(conversation_id.to_string()), turns);
        self
    }

    /// Delay every load, to observe concurrency with the cache lookup.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Make every load and append fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn turns(&self, conversation_id: &str) -> Vec<Turn> {
        self.conversations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&ConversationId(conversation_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MockHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockHistoryStore {
    fn name(&self) -> &str {
        "mock-history"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::History
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatlineError> {
        if self.fail.load(Ordering::SeqCst) {
            Ok(HealthStatus::Degraded("failure injection enabled".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl HistoryStore for MockHistoryStore {
    async fn load(
        &self,
        _user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Turn>, ChatlineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatlineError::Storage {
                source: "mock history load failure".into(),
            });
        }
        Ok(self
            .conversations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, conversation_id: &ConversationId, turn: Turn) -> Result<(), ChatlineError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatlineError::Storage {
                source: "mock history append failure".into(),
            });
        }
        self.conversations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(conversation_id.clone())
            .or_default()
            .push(turn);
        Ok(())
    }
}
