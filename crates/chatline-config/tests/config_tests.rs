// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Chatline configuration system.

use std::io::Write;

use chatline_config::diagnostic::ConfigError;
use chatline_config::model::ChatlineConfig;
use chatline_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn valid_toml_deserializes_into_chatline_config() {
    let toml = r####"
[server]
host = "0.0.0.0"
port = 9000

[log]
level = "debug"

[preprocess]
max_length = 2000
simple_threshold = 40

[cache]
capacity = 10
context_turns = 2

[pool]
capacity = 5
acquire_timeout_ms = 250

[routing.code]
model = "qwen-coder"
temperature = 0.2
max_tokens = 800
context_window = 8192

[ollama]
base_url = "http://ollama:11434"
stop = ["###"]
"####;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.preprocess.max_length, 2000);
    assert_eq!(config.preprocess.simple_threshold, 40);
    assert_eq!(config.cache.capacity, 10);
    assert_eq!(config.cache.context_turns, 2);
    assert_eq!(config.pool.capacity, 5);
    assert_eq!(config.pool.acquire_timeout_ms, 250);
    assert_eq!(config.routing.code.model, "qwen-coder");
    assert_eq!(config.routing.code.max_tokens, 800);
    // Untouched profiles keep their defaults.
    assert_eq!(config.routing.general.model, "llama3");
    assert_eq!(config.ollama.base_url, "http://ollama:11434");
    assert_eq!(config.ollama.stop, vec!["###"]);
}

#[test]
fn serialized_defaults_are_sensible() {
    let config = ChatlineConfig::default();

    assert_eq!(config.preprocess.max_length, 4000);
    assert_eq!(config.preprocess.simple_threshold, 50);
    assert!(config.preprocess.code_keywords.iter().any(|k| k == "python"));
    assert_eq!(
        config.preprocess.quick_replies.get("hello").map(String::as_str),
        Some("Hello! How can I help you today?")
    );
    assert_eq!(config.cache.capacity, 100);
    assert_eq!(config.cache.context_turns, 3);
    assert_eq!(config.pool.capacity, 3);
    assert_eq!(config.routing.fast.temperature, 0.5);
    assert_eq!(config.routing.code.temperature, 0.3);
    assert_eq!(config.routing.general.temperature, 0.7);
    assert_eq!(config.classifier.temperature, 0.1);
    assert_eq!(config.classifier.max_tokens, 10);
    assert_eq!(config.classifier.context_window, 512);
    assert_eq!(config.ollama.top_k, 40);
    assert_eq!(config.ollama.stop.len(), 4);
    assert!(config.prometheus.enabled);
}

#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: ChatlineConfig = Figment::new()
        .merge(Serialized::defaults(ChatlineConfig::default()))
        .merge(Toml::file("/nonexistent/path/chatline.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.pool.capacity, 3);
}

/// Dotted keys land in nested routing profiles, the way mapped env vars do.
#[test]
fn dotted_override_reaches_nested_profile() {
    use figment::{Figment, providers::Serialized};

    let key = chatline_config::loader::map_env_key("routing_fast_model");
    let config: ChatlineConfig = Figment::new()
        .merge(Serialized::defaults(ChatlineConfig::default()))
        .merge((key.as_str(), "phi3"))
        .extract()
        .expect("should set routing.fast.model via dot notation");

    assert_eq!(config.routing.fast.model, "phi3");
    assert_eq!(config.routing.fast.temperature, 0.5);
}

#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[unknown_section]
key = "value"
"#;

    let result = load_config_from_str(toml);
    assert!(result.is_err(), "unknown top-level section should be rejected");
}

#[test]
fn diagnostic_error_includes_unknown_key_and_suggestion() {
    let toml = r#"
[cache]
capcity = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "capcity"
                && suggestion.as_deref() == Some("capacity")
                && valid_keys.contains("context_turns")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'capcity', got: {errors:?}"
    );
}

#[test]
fn unknown_key_in_nested_profile_is_reported() {
    let toml = r#"
[routing.code]
modle = "x"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion, .. }
            if key == "modle" && suggestion.as_deref() == Some("model")
    )));
}

#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[pool]
capacity = "three"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidType { key, .. } if key.contains("capacity")
        )),
        "got: {errors:?}"
    );
}

#[test]
fn config_error_implements_diagnostic() {
    use miette::Diagnostic;

    let error = ConfigError::UnknownKey {
        key: "capcity".to_string(),
        suggestion: Some("capacity".to_string()),
        valid_keys: "capacity, context_turns".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(
        help.contains("did you mean `capacity`"),
        "help should contain suggestion, got: {help}"
    );
}

#[test]
fn validation_errors_surface_through_load() {
    let toml = r#"
[cache]
capacity = 0

[ollama]
base_url = "ftp://nowhere"
"#;

    let errors = load_and_validate_str(toml).expect_err("invalid values should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("cache.capacity"))
    ));
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("ollama.base_url"))
    ));
}

#[test]
fn quick_replies_can_be_extended() {
    let toml = r#"
[preprocess.quick_replies]
salut = "Bonjour !"
"#;

    let config = load_and_validate_str(toml).expect("should validate");
    // A table in TOML merges over the default map.
    assert_eq!(
        config.preprocess.quick_replies.get("salut").map(String::as_str),
        Some("Bonjour !")
    );
    assert!(config.preprocess.quick_replies.contains_key("hello"));
}

#[test]
fn load_from_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[pool]\ncapacity = 7").expect("write config");

    let config = load_and_validate_path(file.path()).expect("should load");
    assert_eq!(config.pool.capacity, 7);
}

#[test]
fn explicit_path_errors_name_the_key() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[pool]\ncapcity = 7").expect("write config");

    let errors = load_and_validate_path(file.path()).expect_err("should fail");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, .. } if key == "capcity"
    )));
}
