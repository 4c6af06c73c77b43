// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Chatline pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Chatline configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional and has working defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatlineConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Message validation and keyword tables.
    #[serde(default)]
    pub preprocess: PreprocessConfig,

    /// Heuristic keywords and the fallback classification call.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Backend profiles per route tier.
    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    /// Generation timeouts and history windowing.
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Ollama backend connection and sampling options.
    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Preprocessor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessConfig {
    /// Longest accepted message, in characters.
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Trimmed messages shorter than this are classed simple.
    #[serde(default = "default_simple_threshold")]
    pub simple_threshold: usize,

    /// Keywords that mark a message as a code request.
    #[serde(default = "default_code_keywords")]
    pub code_keywords: Vec<String>,

    /// Words that mark a message as a question.
    #[serde(default = "default_question_words")]
    pub question_words: Vec<String>,

    /// Canned replies keyed by lowercase phrase.
    #[serde(default = "default_quick_replies")]
    pub quick_replies: BTreeMap<String, String>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            simple_threshold: default_simple_threshold(),
            code_keywords: default_code_keywords(),
            question_words: default_question_words(),
            quick_replies: default_quick_replies(),
        }
    }
}

fn default_max_length() -> usize {
    4000
}

fn default_simple_threshold() -> usize {
    50
}

fn default_code_keywords() -> Vec<String> {
    [
        "code",
        "function",
        "class",
        "variable",
        "loop",
        "if",
        "else",
        "python",
        "javascript",
        "html",
        "css",
        "sql",
        "api",
        "debug",
        "error",
        "exception",
        "import",
        "def",
        "return",
        "programming",
        "algorithm",
        "syntax",
        "compile",
        "execute",
        "script",
        "framework",
        "library",
        "package",
        "module",
        "method",
        "parameter",
        "argument",
        "array",
        "object",
        "string",
        "integer",
        "boolean",
        "float",
        "list",
        "dictionary",
        "tuple",
        "set",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_question_words() -> Vec<String> {
    ["how", "what", "why", "when", "where", "who"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_quick_replies() -> BTreeMap<String, String> {
    [
        ("hello", "Hello! How can I help you today?"),
        ("hi", "Hi there! What would you like to know?"),
        (
            "thanks",
            "You're welcome! Is there anything else I can help with?",
        ),
        (
            "thank you",
            "You're welcome! Feel free to ask if you need more help.",
        ),
        ("bye", "Goodbye! Have a great day!"),
        ("goodbye", "See you later! Take care!"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Keywords that settle a message as general without a backend call.
    #[serde(default = "default_general_keywords")]
    pub general_keywords: Vec<String>,

    /// Model used for the fallback classification call.
    #[serde(default = "default_classifier_model")]
    pub model: String,

    #[serde(default = "default_classifier_temperature")]
    pub temperature: f32,

    #[serde(default = "default_classifier_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_classifier_context_window")]
    pub context_window: u32,

    /// Hard bound on the fallback call, in milliseconds.
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of message characters quoted in the classification prompt.
    #[serde(default = "default_prompt_chars")]
    pub prompt_chars: usize,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            general_keywords: default_general_keywords(),
            model: default_classifier_model(),
            temperature: default_classifier_temperature(),
            max_tokens: default_classifier_max_tokens(),
            context_window: default_classifier_context_window(),
            timeout_ms: default_classifier_timeout_ms(),
            prompt_chars: default_prompt_chars(),
        }
    }
}

fn default_general_keywords() -> Vec<String> {
    [
        "weather", "history", "cooking", "recipe", "travel", "story", "music", "movie", "book",
        "sport", "news", "health", "food", "favorite", "color",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_classifier_model() -> String {
    "mistral".to_string()
}

fn default_classifier_temperature() -> f32 {
    0.1
}

fn default_classifier_max_tokens() -> u32 {
    10
}

fn default_classifier_context_window() -> u32 {
    512
}

fn default_classifier_timeout_ms() -> u64 {
    3000
}

fn default_prompt_chars() -> usize {
    100
}

/// Backend choice and sampling parameters for one route tier.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendProfile {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub context_window: u32,
}

/// Parameter optimizer table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Short messages: low-latency backend, reduced budget.
    #[serde(default = "default_fast_profile")]
    pub fast: BackendProfile,

    /// Code requests: precision backend.
    #[serde(default = "default_code_profile")]
    pub code: BackendProfile,

    /// Everything else: largest budget.
    #[serde(default = "default_general_profile")]
    pub general: BackendProfile,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_profile(),
            code: default_code_profile(),
            general: default_general_profile(),
        }
    }
}

fn default_fast_profile() -> BackendProfile {
    BackendProfile {
        model: "mistral".to_string(),
        temperature: 0.5,
        max_tokens: 512,
        context_window: 2048,
    }
}

fn default_code_profile() -> BackendProfile {
    BackendProfile {
        model: "deepseek-coder".to_string(),
        temperature: 0.3,
        max_tokens: 1024,
        context_window: 4096,
    }
}

fn default_general_profile() -> BackendProfile {
    BackendProfile {
        model: "llama3".to_string(),
        temperature: 0.7,
        max_tokens: 2048,
        context_window: 4096,
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached responses.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Number of trailing context turns folded into the cache key.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            context_turns: default_context_turns(),
        }
    }
}

fn default_cache_capacity() -> usize {
    100
}

fn default_context_turns() -> usize {
    3
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Number of backend connections.
    #[serde(default = "default_pool_capacity")]
    pub capacity: usize,

    /// How long a request waits for a free connection, in milliseconds.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_pool_capacity(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

fn default_pool_capacity() -> usize {
    3
}

fn default_acquire_timeout_ms() -> u64 {
    10_000
}

/// Generation timeouts and prompt history windowing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Maximum wait for the stream to open and yield its first delta, in seconds.
    #[serde(default = "default_first_token_timeout_secs")]
    pub first_token_timeout_secs: u64,

    /// Maximum gap between two deltas, in seconds.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Turns kept in `buffer` memory mode (also the history load window).
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Estimated token budget in `token_buffer` memory mode.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Turns kept verbatim after the digest in `summary` memory mode.
    #[serde(default = "default_summary_recent_turns")]
    pub summary_recent_turns: usize,
}

impl GenerationConfig {
    pub fn first_token_timeout(&self) -> Duration {
        Duration::from_secs(self.first_token_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            first_token_timeout_secs: default_first_token_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            history_turns: default_history_turns(),
            token_budget: default_token_budget(),
            summary_recent_turns: default_summary_recent_turns(),
        }
    }
}

fn default_first_token_timeout_secs() -> u64 {
    60
}

fn default_idle_timeout_secs() -> u64 {
    30
}

fn default_history_turns() -> usize {
    20
}

fn default_token_budget() -> usize {
    1500
}

fn default_summary_recent_turns() -> usize {
    4
}

/// Streaming emitter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingConfig {
    /// Bounded channel size between a request task and its consumer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Deltas are buffered until at least this many characters accumulate.
    /// Zero forwards every delta as-is.
    #[serde(default)]
    pub coalesce_chars: usize,

    /// Buffered text is flushed after this long even below `coalesce_chars`.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl StreamingConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            coalesce_chars: 0,
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

fn default_channel_capacity() -> usize {
    64
}

fn default_flush_interval_ms() -> u64 {
    50
}

/// Ollama backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,

    #[serde(default = "default_num_thread")]
    pub num_thread: u32,

    /// Sequences that end a generation.
    #[serde(default = "default_stop_sequences")]
    pub stop: Vec<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
            num_thread: default_num_thread(),
            stop: default_stop_sequences(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f32 {
    0.9
}

fn default_repeat_penalty() -> f32 {
    1.1
}

fn default_num_thread() -> u32 {
    4
}

fn default_stop_sequences() -> Vec<String> {
    ["Human:", "Assistant:", "User:", "AI:"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Serve `/metrics` and record request metrics.
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
