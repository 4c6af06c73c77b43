// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message validation and lightweight analysis.
//!
//! Turns raw text into a [`MessageDescriptor`] with no I/O. Everything the
//! preprocessor knows comes from the text and the static keyword tables.

use std::collections::HashSet;

use chatline_config::model::PreprocessConfig;
use chatline_core::{LengthClass, MessageDescriptor, ValidationError};

use crate::quick_reply::QuickReplyTable;

/// Keywords split by shape: single words match whole tokens, phrases match
/// as substrings of the lowercased text.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    words: HashSet<String>,
    phrases: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            if keyword.split_whitespace().nth(1).is_some() {
                set.phrases.push(keyword);
            } else {
                set.words.insert(keyword);
            }
        }
        set
    }

    /// Whether `lowered` contains any keyword. `lowered` must already be lowercase.
    pub fn matches(&self, lowered: &str) -> bool {
        tokens(lowered).any(|t| self.words.contains(t))
            || self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

/// Alphanumeric tokens of a string. Apostrophes split, so "what's" yields "what".
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// Validates and describes inbound messages.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    max_length: usize,
    simple_threshold: usize,
    code_keywords: KeywordSet,
    question_words: KeywordSet,
    quick_replies: QuickReplyTable,
}

impl Preprocessor {
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            max_length: config.max_length,
            simple_threshold: config.simple_threshold,
            code_keywords: KeywordSet::new(&config.code_keywords),
            question_words: KeywordSet::new(&config.question_words),
            quick_replies: QuickReplyTable::new(&config.quick_replies),
        }
    }

    /// Validate `text` and derive its descriptor.
    ///
    /// Lengths are counted in characters, not bytes.
    pub fn preprocess(&self, text: &str) -> Result<MessageDescriptor, ValidationError> {
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(ValidationError::Empty);
        }

        let length = normalized.chars().count();
        if length > self.max_length {
            return Err(ValidationError::TooLong {
                length,
                max: self.max_length,
            });
        }

        let lowered = normalized.to_lowercase();
        let length_class = if length < self.simple_threshold {
            LengthClass::Simple
        } else {
            LengthClass::Complex
        };

        Ok(MessageDescriptor {
            normalized_text: normalized.to_string(),
            length_class,
            is_question: normalized.ends_with('?') || self.question_words.matches(&lowered),
            is_code_request: self.code_keywords.matches(&lowered),
            quick_reply: self.quick_replies.lookup(normalized).map(str::to_string),
        })
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(&PreprocessConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_and_blank_are_rejected() {
        let p = Preprocessor::default();
        assert_eq!(p.preprocess(""), Err(ValidationError::Empty));
        assert_eq!(p.preprocess("   \n\t"), Err(ValidationError::Empty));
    }

    #[test]
    fn too_long_is_rejected() {
        let p = Preprocessor::default();
        let text = "a".repeat(4001);
        assert_eq!(
            p.preprocess(&text),
            Err(ValidationError::TooLong {
                length: 4001,
                max: 4000
            })
        );
        assert!(p.preprocess(&"a".repeat(4000)).is_ok());
    }

    #[test]
    fn length_is_counted_in_characters() {
        let p = Preprocessor::default();
        // 49 two-byte characters is still simple.
        let d = p.preprocess(&"é".repeat(49)).unwrap();
        assert_eq!(d.length_class, LengthClass::Simple);
    }

    #[test]
    fn threshold_boundary() {
        let p = Preprocessor::default();
        assert_eq!(
            p.preprocess(&"x".repeat(49)).unwrap().length_class,
            LengthClass::Simple
        );
        assert_eq!(
            p.preprocess(&"x".repeat(50)).unwrap().length_class,
            LengthClass::Complex
        );
    }

    #[test]
    fn questions_by_mark_or_interrogative() {
        let p = Preprocessor::default();
        assert!(p.preprocess("Is it raining?").unwrap().is_question);
        assert!(p.preprocess("tell me WHY the sky is blue").unwrap().is_question);
        assert!(p.preprocess("what's new").unwrap().is_question);
        assert!(!p.preprocess("Hello!").unwrap().is_question);
        // "show" contains "how" but is not the word "how".
        assert!(!p.preprocess("show me the menu").unwrap().is_question);
    }

    #[test]
    fn code_requests_match_whole_words() {
        let p = Preprocessor::default();
        assert!(
            p.preprocess("How do I implement binary search in Python?")
                .unwrap()
                .is_code_request
        );
        assert!(p.preprocess("fix this SQL query").unwrap().is_code_request);
        // "classic" contains "class" but is a different word.
        assert!(!p.preprocess("a classic novel").unwrap().is_code_request);
        assert!(!p.preprocess("I need help with cooking").unwrap().is_code_request);
    }

    #[test]
    fn multi_word_keywords_match_as_phrases() {
        let set = KeywordSet::new(["unit test", "rust"]);
        assert!(set.matches("write a unit test please"));
        assert!(set.matches("rust"));
        assert!(!set.matches("a unit of testing"));
    }

    #[test]
    fn quick_reply_is_attached() {
        let p = Preprocessor::default();
        let d = p.preprocess("  Hello ").unwrap();
        assert_eq!(d.normalized_text, "Hello");
        assert_eq!(d.quick_reply.as_deref(), Some("Hello! How can I help you today?"));
        assert!(p.preprocess("hello world").unwrap().quick_reply.is_none());
    }

    proptest! {
        #[test]
        fn short_trimmed_text_is_simple(
            core in "[a-zA-Z0-9 ?]{0,48}[a-zA-Z0-9?]",
            pad_left in "[ \t]{0,5}",
            pad_right in "[ \t\n]{0,5}",
        ) {
            let p = Preprocessor::default();
            let text = format!("{pad_left}{core}{pad_right}");
            let d = p.preprocess(&text).unwrap();
            prop_assert!(d.normalized_text.chars().count() < 50);
            prop_assert_eq!(d.length_class, LengthClass::Simple);
        }

        #[test]
        fn long_trimmed_text_is_complex(core in "[a-z]{50,300}") {
            let p = Preprocessor::default();
            let d = p.preprocess(&core).unwrap();
            prop_assert_eq!(d.length_class, LengthClass::Complex);
        }
    }
}
