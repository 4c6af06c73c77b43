// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementation of the HistoryStore trait.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use chatline_core::{
    AdapterType, ChatlineError, ConversationId, HealthStatus, HistoryStore, PluginAdapter, Turn,
    UserId,
};

/// Turns kept per conversation before the oldest are dropped.
pub const DEFAULT_MAX_TURNS: usize = 200;

/// Conversation history held in process memory.
///
/// Each conversation keeps at most `max_turns` turns, oldest first. Nothing
/// survives a restart.
pub struct MemoryHistoryStore {
    conversations: DashMap<ConversationId, Vec<Turn>>,
    max_turns: usize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_max_turns(DEFAULT_MAX_TURNS)
    }

    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            conversations: DashMap::new(),
            max_turns: max_turns.max(1),
        }
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Forget a conversation. Returns the number of turns removed.
    pub fn remove(&self, conversation_id: &ConversationId) -> usize {
        self.conversations
            .remove(conversation_id)
            .map(|(_, turns)| turns.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryHistoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::History
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatlineError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Turn>, ChatlineError> {
        let turns = self
            .conversations
            .get(conversation_id)
            .map(|turns| turns.clone())
            .unwrap_or_default();
        debug!(
            user_id = user_id.0.as_str(),
            conversation_id = conversation_id.0.as_str(),
            turns = turns.len(),
            "history loaded"
        );
        Ok(turns)
    }

    async fn append(&self, conversation_id: &ConversationId, turn: Turn) -> Result<(), ChatlineError> {
        let mut turns = self.conversations.entry(conversation_id.clone()).or_default();
        turns.push(turn);
        if turns.len() > self.max_turns {
            let excess = turns.len() - self.max_turns;
            turns.drain(..excess);
        }
        Ok(())
    }
}
