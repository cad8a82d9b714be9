//! Relay configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub budget: BudgetConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Upstream completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Chat completions endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout for non-streaming calls in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Token ceiling for the main completion
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,

    /// Sampling temperature for the main completion
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Token budget thresholds
///
/// The defaults are tuned for a ~1000-token history window on the default
/// upstream model; deployments targeting a different model override them
/// through the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Nominal history token budget
    #[serde(default = "default_history_budget")]
    pub history_budget_tokens: u32,

    /// Fraction of the history budget actually used, headroom for
    /// estimator inaccuracy
    #[serde(default = "default_safety_factor")]
    pub budget_safety_factor: f64,

    /// Reject threshold for a single turn, checked before any upstream call
    #[serde(default = "default_oversized_turn")]
    pub oversized_turn_tokens: u32,

    /// Token ceiling for the summarization call
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    /// Sampling temperature for the summarization call
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_body_bytes() -> usize { 2 * 1024 * 1024 }
fn default_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_timeout_ms() -> u64 { 30_000 }
fn default_max_completion_tokens() -> u32 { 3000 }
fn default_temperature() -> f32 { 0.3 }
fn default_history_budget() -> u32 { 1000 }
fn default_safety_factor() -> f64 { 0.9 }
fn default_oversized_turn() -> u32 { 800 }
fn default_summary_max_tokens() -> u32 { 600 }
fn default_summary_temperature() -> f32 { 0.0 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            max_completion_tokens: default_max_completion_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            history_budget_tokens: default_history_budget(),
            budget_safety_factor: default_safety_factor(),
            oversized_turn_tokens: default_oversized_turn(),
            summary_max_tokens: default_summary_max_tokens(),
            summary_temperature: default_summary_temperature(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("RELAY_HOST") {
            self.server.host = val;
        }

        // PORT is honored for platform compatibility, RELAY_PORT wins
        if let Ok(val) = std::env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        if let Ok(val) = std::env::var("RELAY_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        if let Ok(val) = std::env::var("RELAY_MAX_BODY_BYTES") {
            if let Ok(bytes) = val.parse() {
                self.server.max_body_bytes = bytes;
            }
        }

        if let Ok(val) = std::env::var("RELAY_UPSTREAM_ENDPOINT") {
            self.upstream.endpoint = val;
        }

        if let Ok(val) = std::env::var("RELAY_UPSTREAM_MODEL") {
            self.upstream.model = val;
        }

        if let Ok(val) = std::env::var("RELAY_UPSTREAM_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.upstream.timeout_ms = timeout;
            }
        }

        if let Ok(val) = std::env::var("RELAY_MAX_COMPLETION_TOKENS") {
            if let Ok(tokens) = val.parse() {
                self.upstream.max_completion_tokens = tokens;
            }
        }

        if let Ok(val) = std::env::var("RELAY_TEMPERATURE") {
            if let Ok(temp) = val.parse() {
                self.upstream.temperature = temp;
            }
        }

        if let Ok(val) = std::env::var("RELAY_HISTORY_BUDGET_TOKENS") {
            if let Ok(tokens) = val.parse() {
                self.budget.history_budget_tokens = tokens;
            }
        }

        if let Ok(val) = std::env::var("RELAY_BUDGET_SAFETY_FACTOR") {
            if let Ok(factor) = val.parse() {
                self.budget.budget_safety_factor = factor;
            }
        }

        if let Ok(val) = std::env::var("RELAY_OVERSIZED_TURN_TOKENS") {
            if let Ok(tokens) = val.parse() {
                self.budget.oversized_turn_tokens = tokens;
            }
        }

        if let Ok(val) = std::env::var("RELAY_SUMMARY_MAX_TOKENS") {
            if let Ok(tokens) = val.parse() {
                self.budget.summary_max_tokens = tokens;
            }
        }

        if let Ok(val) = std::env::var("RELAY_SUMMARY_TEMPERATURE") {
            if let Ok(temp) = val.parse() {
                self.budget.summary_temperature = temp;
            }
        }

        self
    }
}

impl UpstreamConfig {
    /// Get the non-streaming call timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl BudgetConfig {
    /// History budget after applying the safety factor
    pub fn effective_history_budget(&self) -> f64 {
        self.history_budget_tokens as f64 * self.budget_safety_factor
    }
}
