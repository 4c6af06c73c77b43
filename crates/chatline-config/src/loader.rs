// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./chatline.toml` > `~/.config/chatline/chatline.toml`
//! > `/etc/chatline/chatline.toml`, with environment variable overrides via the
//! `CHATLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatlineConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/chatline/chatline.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "chatline.toml";

/// Env key prefixes (lowercased, `CHATLINE_` stripped) and the dotted path
/// they map to. Nested sections come before their parents.
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("routing_fast_", "routing.fast."),
    ("routing_code_", "routing.code."),
    ("routing_general_", "routing.general."),
    ("server_", "server."),
    ("log_", "log."),
    ("preprocess_", "preprocess."),
    ("classifier_", "classifier."),
    ("cache_", "cache."),
    ("pool_", "pool."),
    ("generation_", "generation."),
    ("streaming_", "streaming."),
    ("ollama_", "ollama."),
    ("prometheus_", "prometheus."),
];

/// Path of the per-user configuration file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatline").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatline/chatline.toml` (system-wide)
/// 3. `~/.config/chatline/chatline.toml` (user XDG config)
/// 4. `./chatline.toml` (local directory)
/// 5. `CHATLINE_*` environment variables
pub fn load_config() -> Result<ChatlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults only.
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ChatlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(ChatlineConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
///
/// Uses an explicit section table instead of splitting on `_`, since field
/// names contain underscores: `CHATLINE_POOL_ACQUIRE_TIMEOUT_MS` must map to
/// `pool.acquire_timeout_ms`, not `pool.acquire.timeout.ms`.
pub fn map_env_key(key: &str) -> String {
    for (prefix, section) in ENV_SECTIONS {
        if let Some(field) = key.strip_prefix(prefix) {
            return format!("{section}{field}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("CHATLINE_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}
