// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache key derivation.

use std::fmt;

use chatline_core::{Language, Role, Turn};
use sha2::{Digest, Sha256};

/// Characters of each turn kept in the context digest.
const TURN_EXCERPT_CHARS: usize = 100;

/// Stable hash identifying a (message, recent context, language) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a message.
    ///
    /// `normalized_text` must be the preprocessor's trimmed text. Only the last
    /// `context_turns` turns contribute, each truncated, so a long history
    /// does not make keys unique by accident.
    pub fn derive(
        normalized_text: &str,
        context: &[Turn],
        context_turns: usize,
        language: Language,
    ) -> Self {
        let window = &context[context.len().saturating_sub(context_turns)..];
        let mut hasher = Sha256::new();
        update_field(&mut hasher, normalized_text.as_bytes());
        hasher.update((window.len() as u64).to_le_bytes());
        for turn in window {
            update_field(&mut hasher, role_tag(turn.role).as_bytes());
            update_field(&mut hasher, excerpt(&turn.content).as_bytes());
        }
        update_field(&mut hasher, language.to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length-prefixed, so no two field sequences hash the same bytes.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn role_tag(role: Role) -> &'static str {
    match role {
        Role::User => "U",
        Role::Assistant => "A",
        Role::System => "S",
    }
}

fn excerpt(content: &str) -> &str {
    match content.char_indices().nth(TURN_EXCERPT_CHARS) {
        Some((end, _)) => &content[..end],
        None => content,
    }
}
