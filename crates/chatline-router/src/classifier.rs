// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message category classification.
//!
//! Keyword heuristics settle most messages for free. The rest go to a
//! classification backend through a single bounded call. Nothing here is
//! fatal: every failure degrades to the general category.

use std::sync::Arc;
use std::time::Duration;

use chatline_config::model::ClassifierConfig;
use chatline_core::{
    Category, Classification, ClassificationBackend, ClassificationSource, InferenceParams,
    MessageDescriptor,
};
use tracing::{debug, warn};

use crate::preprocess::KeywordSet;

/// Build the prompt sent to the classification backend.
///
/// Only the first `max_chars` characters of the message are quoted.
pub fn classification_prompt(text: &str, max_chars: usize) -> String {
    let excerpt: String = text.chars().take(max_chars).collect();
    format!("Classify: 'code' or 'general'? Message: {excerpt}")
}

/// Parse a backend label. Only an exact "code" or "general" is trusted,
/// ignoring case, surrounding whitespace and punctuation.
pub fn parse_label(reply: &str) -> Option<Category> {
    let label = reply
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    match label.as_str() {
        "code" => Some(Category::Code),
        "general" => Some(Category::General),
        _ => None,
    }
}

/// Heuristic-first classifier with a bounded backend fallback.
pub struct Classifier {
    general_keywords: KeywordSet,
    backend: Arc<dyn ClassificationBackend>,
    params: InferenceParams,
    timeout: Duration,
    prompt_chars: usize,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig, backend: Arc<dyn ClassificationBackend>) -> Self {
        Self {
            general_keywords: KeywordSet::new(&config.general_keywords),
            backend,
            params: InferenceParams {
                model: config.model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                context_window: config.context_window,
            },
            timeout: config.timeout(),
            prompt_chars: config.prompt_chars,
        }
    }

    /// Keyword-only classification. `None` means the heuristics are undecided.
    pub fn heuristic(&self, descriptor: &MessageDescriptor) -> Option<Classification> {
        if descriptor.is_code_request {
            return Some(Classification {
                category: Category::Code,
                source: ClassificationSource::Heuristic,
            });
        }
        if self
            .general_keywords
            .matches(&descriptor.normalized_text.to_lowercase())
        {
            return Some(Classification {
                category: Category::General,
                source: ClassificationSource::Heuristic,
            });
        }
        None
    }

    /// Classify a message. Calls the backend at most once.
    pub async fn classify(&self, descriptor: &MessageDescriptor) -> Classification {
        if let Some(classification) = self.heuristic(descriptor) {
            debug!(category = %classification.category, "classified by keywords");
            return classification;
        }

        let prompt = classification_prompt(&descriptor.normalized_text, self.prompt_chars);
        let call = self.backend.infer(&prompt, &self.params);
        let fallback = Classification {
            category: Category::General,
            source: ClassificationSource::Default,
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(reply)) => match parse_label(&reply) {
                Some(category) => {
                    debug!(category = %category, "classified by backend");
                    Classification {
                        category,
                        source: ClassificationSource::BackendFallback,
                    }
                }
                None => {
                    warn!(reply = reply.as_str(), "unusable classification label, defaulting to general");
                    fallback
                }
            },
            Ok(Err(e)) => {
                warn!(error = %e, "classification backend failed, defaulting to general");
                fallback
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "classification timed out, defaulting to general"
                );
                fallback
            }
        }
    }
}
