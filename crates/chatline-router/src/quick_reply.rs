// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned replies for greetings and closings.

use std::collections::{BTreeMap, HashMap};

/// Constant-time lookup of canned replies by exact phrase.
///
/// Phrases are matched case-insensitively after trimming. Partial matches
/// never hit: "hello there" is not "hello".
#[derive(Debug, Clone, Default)]
pub struct QuickReplyTable {
    entries: HashMap<String, String>,
}

impl QuickReplyTable {
    pub fn new(phrases: &BTreeMap<String, String>) -> Self {
        let entries = phrases
            .iter()
            .map(|(phrase, reply)| (normalize(phrase), reply.clone()))
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, text: &str) -> Option<&str> {
        self.entries.get(&normalize(text)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
