//! Configuration loading, validation, and management for shellpilot.
//!
//! Loads settings from `~/.shellpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! User-defined tools live in a separate JSON file, see [`tool_config`].

pub mod tool_config;

pub use tool_config::{ToolConfig, ToolInputDef, load_tool_configs};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.shellpilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Messages API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for every call
    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Extended-thinking budget; unset disables thinking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,

    /// Upper bound on model calls in one conversation loop
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Name shown to the model in the user context block
    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// When true, shell commands are never spawned
    #[serde(default)]
    pub dry_run: bool,

    /// Key for the Jina web tools; the tools are absent without it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jina_api_key: Option<String>,

    /// JSON file with user-defined tools (default: `~/.shellpilot/tools.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config_path: Option<PathBuf>,

    /// Memory document (default: `~/.shellpilot/memory.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_path: Option<PathBuf>,

    /// SQLite history (default: `~/.shellpilot/data/history.db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_db: Option<PathBuf>,

    /// Where `export` writes markdown (default: `~/.shellpilot/exports`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// Editor for `edit tools|memory` (falls back to `$EDITOR`, then `nano`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_command: Option<String>,

    /// Shell execution settings
    #[serde(default)]
    pub shell: ShellConfig,

    /// Custom model pricing (model name → per-million prices)
    #[serde(default)]
    pub pricing: HashMap<String, PricingOverrideConfig>,
}

fn default_api_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_max_iterations() -> usize {
    25
}
fn default_user_name() -> String {
    "User".into()
}

/// Smallest extended-thinking budget the API accepts.
pub const MIN_THINKING_BUDGET: u32 = 1024;

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
            .field("max_tokens", &self.max_tokens)
            .field("thinking_budget", &self.thinking_budget)
            .field("max_iterations", &self.max_iterations)
            .field("user_name", &self.user_name)
            .field("dry_run", &self.dry_run)
            .field("jina_api_key", &redact(&self.jina_api_key))
            .field("tool_config_path", &self.tool_config_path)
            .field("memory_path", &self.memory_path)
            .field("history_db", &self.history_db)
            .field("export_dir", &self.export_dir)
            .field("editor_command", &self.editor_command)
            .field("shell", &self.shell)
            .field("pricing", &self.pricing)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Per-command timeout in seconds (0 = unbounded)
    #[serde(default)]
    pub timeout_secs: u64,
}

/// Custom per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// Price per 1M input tokens in USD
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD
    pub output_per_m: f64,
}

impl AppConfig {
    /// Load configuration from the default path (~/.shellpilot/config.toml).
    ///
    /// Environment overrides:
    /// - `SHELLPILOT_API_KEY`, then `ANTHROPIC_API_KEY` (when no key is configured)
    /// - `SHELLPILOT_MODEL`
    /// - `JINA_API_KEY` (when no key is configured)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("SHELLPILOT_API_KEY")
                .ok()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .filter(|k| !k.is_empty());
        }

        if let Ok(model) = std::env::var("SHELLPILOT_MODEL") {
            if !model.is_empty() {
                self.model = model;
            }
        }

        if self.jina_api_key.is_none() {
            self.jina_api_key = std::env::var("JINA_API_KEY").ok().filter(|k| !k.is_empty());
        }
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

    /// Write the configuration to a specific file path, creating parents.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let rendered = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(format!("cannot serialize settings: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(path, rendered).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write the configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shellpilot")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn tool_config_file(&self) -> PathBuf {
        self.tool_config_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("tools.json"))
    }

    pub fn memory_file(&self) -> PathBuf {
        self.memory_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("memory.json"))
    }

    pub fn history_db_file(&self) -> PathBuf {
        self.history_db
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("data").join("history.db"))
    }

    pub fn export_directory(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("exports"))
    }

    /// Editor command for `edit`: settings, then `$EDITOR`, then `nano`.
    pub fn editor(&self) -> String {
        self.editor_command
            .clone()
            .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.is_empty()))
            .unwrap_or_else(|| "nano".into())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationError("max_iterations must be > 0".into()));
        }

        if let Some(budget) = self.thinking_budget {
            if budget < MIN_THINKING_BUDGET {
                return Err(ConfigError::ValidationError(format!(
                    "thinking_budget must be at least {MIN_THINKING_BUDGET}"
                )));
            }
            if budget >= self.max_tokens {
                return Err(ConfigError::ValidationError(
                    "thinking_budget must be less than max_tokens".into(),
                ));
            }
        }

        for (model, price) in &self.pricing {
            if price.input_per_m < 0.0 || price.output_per_m < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "pricing for {model} must not be negative"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    // ── Dotted-key access (for `settings get/set`) ──

    fn as_toml(&self) -> Result<toml::Value, ConfigError> {
        toml::Value::try_from(self)
            .map_err(|e| ConfigError::ValidationError(format!("cannot serialize settings: {e}")))
    }

    /// Read one setting by dotted key, e.g. `shell.timeout_secs`.
    /// Secrets are redacted.
    pub fn get_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if is_secret(key) {
            let set = match key {
                "api_key" => self.api_key.is_some(),
                _ => self.jina_api_key.is_some(),
            };
            return Ok(set.then(|| "[REDACTED]".to_string()));
        }

        let root = self.as_toml()?;
        let mut node = &root;
        for part in key.split('.') {
            match node.get(part) {
                Some(next) => node = next,
                None => return Ok(None),
            }
        }
        Ok(Some(match node {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    /// Set one setting by dotted key. The value is parsed as a TOML literal
    /// when the schema accepts it (numbers, booleans), otherwise stored as a
    /// string. The result must still validate.
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let updated = match self.with_value(&parts, parse_literal(raw)) {
            Ok(cfg) => cfg,
            Err(_) => self.with_value(&parts, toml::Value::String(raw.to_string()))?,
        };
        updated.validate()?;

        // A key the schema does not know silently vanishes on round-trip.
        let check = updated.as_toml()?;
        let mut node = Some(&check);
        for part in &parts {
            node = node.and_then(|v| v.get(*part));
        }
        if node.is_none() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        *self = updated;
        Ok(())
    }

    fn with_value(&self, parts: &[&str], value: toml::Value) -> Result<AppConfig, ConfigError> {
        let key = parts.join(".");
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;

        let mut root = self.as_toml()?;
        let mut node = &mut root;
        for part in parents {
            let table = node
                .as_table_mut()
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            node = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        }
        node.as_table_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?
            .insert(last.to_string(), value);

        root.try_into::<AppConfig>()
            .map_err(|e| ConfigError::ValidationError(format!("{key}: {}", e.message())))
    }

    /// All settings as pretty TOML with secrets redacted.
    pub fn render_redacted(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.api_key.is_some() {
            shown.api_key = Some("[REDACTED]".into());
        }
        if shown.jina_api_key.is_some() {
            shown.jina_api_key = Some("[REDACTED]".into());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| ConfigError::ValidationError(format!("cannot serialize settings: {e}")))
    }
}

fn is_secret(key: &str) -> bool {
    matches!(key, "api_key" | "jina_api_key")
}

fn parse_literal(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(raw.to_string())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            thinking_budget: None,
            max_iterations: default_max_iterations(),
            user_name: default_user_name(),
            dry_run: false,
            jina_api_key: None,
            tool_config_path: None,
            memory_path: None,
            history_db: None,
            export_dir: None,
            editor_command: None,
            shell: ShellConfig::default(),
            pricing: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
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

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown setting: {0}")]
    UnknownKey(String),
}
