// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history store trait.

use async_trait::async_trait;

use crate::error::ChatlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationId, Turn, UserId};

/// Persistence for conversation turns.
///
/// Failures are reported to the caller, which treats them as warnings.
#[async_trait]
pub trait HistoryStore: PluginAdapter {
    /// Loads the stored turns of a conversation, oldest first.
    async fn load(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Turn>, ChatlineError>;

    /// Appends one turn to a conversation.
    async fn append(&self, conversation_id: &ConversationId, turn: Turn)
    -> Result<(), ChatlineError>;
}
