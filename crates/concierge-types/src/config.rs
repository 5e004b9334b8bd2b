//! Global configuration types for Concierge.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! model, the per-turn time budgets, the title cache, and the endpoints of
//! the external capabilities.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Concierge service.
///
/// Loaded from `~/.concierge/config.toml`. All fields have sensible defaults.
/// Secrets (API keys) never live here; they come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Model used for both replies and titles.
    #[serde(default = "default_model")]
    pub model: String,

    /// Provider name reported in telemetry (e.g., "openai").
    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// Override for the OpenAI-compatible API base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Overall deadline for one conversation turn.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Upper bound on the time title generation may take.
    #[serde(default = "default_title_budget_cap_ms")]
    pub title_budget_cap_ms: u64,

    /// Time reserved before the turn deadline when sizing the title budget.
    #[serde(default = "default_title_safety_margin_ms")]
    pub title_safety_margin_ms: u64,

    /// Maximum model rounds in one tool loop.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Number of generated titles kept in memory.
    #[serde(default = "default_title_cache_capacity")]
    pub title_cache_capacity: usize,

    /// Bumped whenever the title prompt changes, so stale cache keys miss.
    #[serde(default = "default_title_prompt_version")]
    pub title_prompt_version: String,

    /// ICS feed consulted by the holidays tool.
    #[serde(default = "default_holiday_calendar_url")]
    pub holiday_calendar_url: String,

    /// WeatherAPI base URL.
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
}

fn default_model() -> String {
    "o1".to_string()
}

fn default_provider_name() -> String {
    "openai".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_title_budget_cap_ms() -> u64 {
    15_000
}

fn default_title_safety_margin_ms() -> u64 {
    500
}

fn default_max_tool_rounds() -> usize {
    15
}

fn default_title_cache_capacity() -> usize {
    10_000
}

fn default_title_prompt_version() -> String {
    "v1".to_string()
}

fn default_holiday_calendar_url() -> String {
    "https://www.officeholidays.com/ics/spain/catalonia".to_string()
}

fn default_weather_base_url() -> String {
    "http://api.weatherapi.com/v1".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            provider_name: default_provider_name(),
            base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            title_budget_cap_ms: default_title_budget_cap_ms(),
            title_safety_margin_ms: default_title_safety_margin_ms(),
            max_tool_rounds: default_max_tool_rounds(),
            title_cache_capacity: default_title_cache_capacity(),
            title_prompt_version: default_title_prompt_version(),
            holiday_calendar_url: default_holiday_calendar_url(),
            weather_base_url: default_weather_base_url(),
        }
    }
}
