//! Configuration loading, validation, and management for Stepwise.
//!
//! Loads configuration from `~/.stepwise/config.toml` with environment
//! variable overrides. Every field has a default, so a missing file is
//! equivalent to an empty one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.stepwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the reasoning engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible chat completions base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for reasoning rounds
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per reasoning response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub agent: AgentLoopConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("planner", &self.planner)
            .field("context", &self.context)
            .field("store", &self.store)
            .field("tools", &self.tools)
            .finish()
    }
}

/// Bounded reasoning loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLoopConfig {
    /// Hard cap on reasoning rounds per turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Text-only engine variant: no tools, no plan machinery
    #[serde(default)]
    pub reasoning_only: bool,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Upper bound on a single action execution
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Publish a replan hint when a round's results look like failures.
    /// Advisory only: the plan is never regenerated.
    #[serde(default)]
    pub replan_hint: bool,
}

fn default_max_rounds() -> usize {
    5
}
fn default_system_prompt() -> String {
    "You are a careful research assistant. Use the available tools to gather \
     what you need, then call final_answer with a complete response."
        .into()
}
fn default_tool_timeout() -> u64 {
    30
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            reasoning_only: false,
            system_prompt: default_system_prompt(),
            tool_timeout_secs: default_tool_timeout(),
            replan_hint: false,
        }
    }
}

/// Plan generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fast model for plan generation; falls back to the main model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_planner_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_planner_temperature")]
    pub temperature: f32,
}

fn default_true() -> bool {
    true
}
fn default_planner_timeout() -> u64 {
    20
}
fn default_planner_temperature() -> f32 {
    0.2
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            timeout_secs: default_planner_timeout(),
            temperature: default_planner_temperature(),
        }
    }
}

/// State-context injection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Ceiling on the injected state block, in characters
    #[serde(default = "default_context_max_chars")]
    pub max_chars: usize,

    /// Per-result cap when folding action results into context
    #[serde(default = "default_result_preview_chars")]
    pub result_preview_chars: usize,
}

fn default_context_max_chars() -> usize {
    16_000
}
fn default_result_preview_chars() -> usize {
    500
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_context_max_chars(),
            result_preview_chars: default_result_preview_chars(),
        }
    }
}

/// State store backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// SQLite database path; defaults to `~/.stepwise/state.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_store_backend() -> String {
    "sqlite".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl StoreConfig {
    /// The effective SQLite path.
    pub fn sqlite_path(&self) -> String {
        self.path.clone().unwrap_or_else(|| {
            AppConfig::config_dir()
                .join("state.db")
                .to_string_lossy()
                .into_owned()
        })
    }
}

/// Settings for the built-in actions.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_api_key: Option<String>,

    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    /// Cap on text returned by `fetch_url`
    #[serde(default = "default_fetch_max_chars")]
    pub fetch_max_chars: usize,

    /// Cap on content sent to `analyze_content`
    #[serde(default = "default_analyze_max_chars")]
    pub analyze_max_chars: usize,
}

fn default_search_endpoint() -> String {
    "https://api.search.brave.com/res/v1/web/search".into()
}
fn default_fetch_max_chars() -> usize {
    20_000
}
fn default_analyze_max_chars() -> usize {
    12_000
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            search_api_key: None,
            search_endpoint: default_search_endpoint(),
            fetch_max_chars: default_fetch_max_chars(),
            analyze_max_chars: default_analyze_max_chars(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("search_api_key", &redact(&self.search_api_key))
            .field("search_endpoint", &self.search_endpoint)
            .field("fetch_max_chars", &self.fetch_max_chars)
            .field("analyze_max_chars", &self.analyze_max_chars)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.stepwise/config.toml).
    ///
    /// Environment overrides:
    /// - `STEPWISE_API_KEY`, then `OPENAI_API_KEY` (when no key is configured)
    /// - `STEPWISE_API_URL`, `STEPWISE_MODEL`
    /// - `STEPWISE_SEARCH_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("STEPWISE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(url) = std::env::var("STEPWISE_API_URL") {
            config.api_url = url;
        }
        if let Ok(model) = std::env::var("STEPWISE_MODEL") {
            config.model = model;
        }
        if config.tools.search_api_key.is_none() {
            config.tools.search_api_key = std::env::var("STEPWISE_SEARCH_API_KEY").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepwise")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.planner.temperature) {
            return Err(ConfigError::ValidationError(
                "planner.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_rounds must be at least 1".into(),
            ));
        }
        if self.agent.tool_timeout_secs == 0 || self.planner.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least 1 second".into(),
            ));
        }
        if self.context.max_chars < 256 {
            return Err(ConfigError::ValidationError(
                "context.max_chars must be at least 256".into(),
            ));
        }
        if self.context.result_preview_chars == 0 {
            return Err(ConfigError::ValidationError(
                "context.result_preview_chars must be positive".into(),
            ));
        }
        if !matches!(self.store.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "store.backend must be \"sqlite\" or \"memory\", got \"{}\"",
                self.store.backend
            )));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The model used for plan generation.
    pub fn planner_model(&self) -> &str {
        self.planner.model.as_deref().unwrap_or(&self.model)
    }

    /// Generate a default config TOML string (for `stepwise init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentLoopConfig::default(),
            planner: PlannerConfig::default(),
            context: ContextConfig::default(),
            store: StoreConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
