// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: positive capacities,
//! temperature ranges, non-empty keyword tables, and backend URL shape.

use crate::diagnostic::ConfigError;
use crate::model::{BackendProfile, ChatlineConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ChatlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.server.host.trim().is_empty() {
        fail("server.host must not be empty".to_string());
    }

    let level = config.log.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    let pre = &config.preprocess;
    if pre.max_length == 0 {
        fail("preprocess.max_length must be greater than 0".to_string());
    }
    if pre.simple_threshold >= pre.max_length {
        fail(format!(
            "preprocess.simple_threshold ({}) must be below preprocess.max_length ({})",
            pre.simple_threshold, pre.max_length
        ));
    }
    if pre.code_keywords.iter().all(|k| k.trim().is_empty()) {
        fail("preprocess.code_keywords must contain at least one keyword".to_string());
    }
    if pre.question_words.iter().all(|k| k.trim().is_empty()) {
        fail("preprocess.question_words must contain at least one word".to_string());
    }
    for (phrase, reply) in &pre.quick_replies {
        if phrase.trim().is_empty() || reply.trim().is_empty() {
            fail(format!(
                "preprocess.quick_replies entry `{phrase}` must have a non-empty phrase and reply"
            ));
        }
    }

    let cls = &config.classifier;
    if cls.model.trim().is_empty() {
        fail("classifier.model must not be empty".to_string());
    }
    check_temperature("classifier.temperature", cls.temperature, &mut fail);
    if cls.timeout_ms == 0 {
        fail("classifier.timeout_ms must be greater than 0".to_string());
    }
    if cls.max_tokens == 0 {
        fail("classifier.max_tokens must be greater than 0".to_string());
    }

    for (name, profile) in [
        ("routing.fast", &config.routing.fast),
        ("routing.code", &config.routing.code),
        ("routing.general", &config.routing.general),
    ] {
        check_profile(name, profile, &mut fail);
    }

    if config.cache.capacity == 0 {
        fail("cache.capacity must be greater than 0".to_string());
    }

    if config.pool.capacity == 0 {
        fail("pool.capacity must be greater than 0".to_string());
    }
    if config.pool.acquire_timeout_ms == 0 {
        fail("pool.acquire_timeout_ms must be greater than 0".to_string());
    }

    let generation = &config.generation;
    if generation.first_token_timeout_secs == 0 || generation.idle_timeout_secs == 0 {
        fail("generation timeouts must be greater than 0".to_string());
    }
    if generation.history_turns == 0 {
        fail("generation.history_turns must be greater than 0".to_string());
    }

    if config.streaming.channel_capacity == 0 {
        fail("streaming.channel_capacity must be greater than 0".to_string());
    }

    let url = config.ollama.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        fail(format!(
            "ollama.base_url `{url}` must start with http:// or https://"
        ));
    }
    if !(0.0..=1.0).contains(&config.ollama.top_p) {
        fail(format!(
            "ollama.top_p must be within [0, 1], got {}",
            config.ollama.top_p
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_profile(name: &str, profile: &BackendProfile, fail: &mut impl FnMut(String)) {
    if profile.model.trim().is_empty() {
        fail(format!("{name}.model must not be empty"));
    }
    check_temperature(&format!("{name}.temperature"), profile.temperature, fail);
    if profile.max_tokens == 0 {
        fail(format!("{name}.max_tokens must be greater than 0"));
    }
    if profile.context_window < profile.max_tokens {
        fail(format!(
            "{name}.context_window ({}) must be at least max_tokens ({})",
            profile.context_window, profile.max_tokens
        ));
    }
}

fn check_temperature(key: &str, value: f32, fail: &mut impl FnMut(String)) {
    if !(0.0..=2.0).contains(&value) {
        fail(format!("{key} must be within [0, 2], got {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(errors: &[ConfigError]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn default_config_validates() {
        let config = ChatlineConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_pool_capacity_fails_validation() {
        let mut config = ChatlineConfig::default();
        config.pool.capacity = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("pool.capacity"))
        ));
    }

    #[test]
    fn temperature_out_of_range_fails_validation() {
        let mut config = ChatlineConfig::default();
        config.routing.code.temperature = 3.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors)
            .iter()
            .any(|m| m.contains("routing.code.temperature")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ChatlineConfig::default();
        config.cache.capacity = 0;
        config.pool.capacity = 0;
        config.ollama.base_url = "localhost:11434".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "got: {:?}", messages(&errors));
    }

    #[test]
    fn threshold_must_stay_below_max_length() {
        let mut config = ChatlineConfig::default();
        config.preprocess.max_length = 40;
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors)
            .iter()
            .any(|m| m.contains("simple_threshold")));
    }

    #[test]
    fn empty_code_keywords_fail_validation() {
        let mut config = ChatlineConfig::default();
        config.preprocess.code_keywords.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = ChatlineConfig::default();
        config.log.level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors).iter().any(|m| m.contains("log.level")));
    }
}
