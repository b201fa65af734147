//! Configuration management for Tabletalk
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, TabletalkError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Tabletalk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Language model provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Answering agent behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Tabular ingestion settings
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Interactive chat settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Provider configuration
///
/// Specifies which language model provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI-compatible provider configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// OpenAI-compatible chat completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model to use for completions
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Optional API base URL (useful for compatible gateways and local mocks)
    ///
    /// When set, `chat/completions` is resolved against this base instead of
    /// the public OpenAI endpoint.
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_base: None,
        }
    }
}

/// Answering agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of model round trips per question
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Timeout for a single answer (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of most recent chat turns supplied to the agent as context
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// SQL toolkit settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_max_turns() -> usize {
    15
}

fn default_timeout() -> u64 {
    120
}

fn default_history_window() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            timeout_seconds: default_timeout(),
            history_window: default_history_window(),
            tools: ToolsConfig::default(),
        }
    }
}

/// SQL toolkit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Maximum size of tool output (bytes)
    #[serde(default = "default_max_output")]
    pub max_output_size: usize,

    /// Maximum number of rows returned by `run_query`
    #[serde(default = "default_max_query_rows")]
    pub max_query_rows: usize,

    /// Number of sample rows included by `describe_tables`
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
}

fn default_max_output() -> usize {
    65_536
}

fn default_max_query_rows() -> usize {
    50
}

fn default_sample_rows() -> usize {
    3
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_output_size: default_max_output(),
            max_query_rows: default_max_query_rows(),
            sample_rows: default_sample_rows(),
        }
    }
}

/// Tabular ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Name of the table uploaded files are materialized into
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Field delimiter of uploaded files
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_table_name() -> String {
    "uploaded_data".to_string()
}

fn default_delimiter() -> char {
    ','
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            delimiter: default_delimiter(),
        }
    }
}

/// Interactive chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Assistant turn every new session starts with
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    "Hello there, I am your CSV chatbot.".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig::default(),
            agent: AgentConfig::default(),
            ingest: IngestConfig::default(),
            chat: ChatConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TabletalkError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| TabletalkError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(model) = std::env::var("TABLETALK_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(api_base) = std::env::var("TABLETALK_API_BASE") {
            self.provider.openai.api_base = Some(api_base);
        }

        if let Ok(max_turns) = std::env::var("TABLETALK_MAX_TURNS") {
            if let Ok(value) = max_turns.parse() {
                self.agent.max_turns = value;
            } else {
                tracing::warn!("Invalid TABLETALK_MAX_TURNS: {}", max_turns);
            }
        }

        if let Ok(timeout) = std::env::var("TABLETALK_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.agent.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid TABLETALK_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(window) = std::env::var("TABLETALK_HISTORY_WINDOW") {
            if let Ok(value) = window.parse() {
                self.agent.history_window = value;
            } else {
                tracing::warn!("Invalid TABLETALK_HISTORY_WINDOW: {}", window);
            }
        }

        if let Ok(table_name) = std::env::var("TABLETALK_TABLE_NAME") {
            self.ingest.table_name = table_name;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(model) = cli.command.model_override() {
            tracing::debug!(model = %model, "CLI override: --model");
            self.provider.openai.model = model.to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(TabletalkError::Config("Provider type cannot be empty".to_string()).into());
        }

        let valid_providers = ["openai"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(TabletalkError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.provider.openai.model.trim().is_empty() {
            return Err(
                TabletalkError::Config("provider.openai.model cannot be empty".to_string()).into(),
            );
        }

        if self.agent.max_turns == 0 {
            return Err(
                TabletalkError::Config("max_turns must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.max_turns > 1000 {
            return Err(TabletalkError::Config(
                "max_turns must be less than or equal to 1000".to_string(),
            )
            .into());
        }

        if self.agent.timeout_seconds == 0 {
            return Err(
                TabletalkError::Config("timeout_seconds must be greater than 0".to_string())
                    .into(),
            );
        }

        if self.agent.history_window == 0 {
            return Err(TabletalkError::Config(
                "history_window must be greater than 0".to_string(),
            )
            .into());
        }

        if self.agent.tools.max_output_size == 0 {
            return Err(TabletalkError::Config(
                "tools.max_output_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.agent.tools.max_query_rows == 0 {
            return Err(TabletalkError::Config(
                "tools.max_query_rows must be greater than 0".to_string(),
            )
            .into());
        }

        if !is_identifier(&self.ingest.table_name) {
            return Err(TabletalkError::Config(format!(
                "ingest.table_name must be a plain SQL identifier, got '{}'",
                self.ingest.table_name
            ))
            .into());
        }

        if !self.ingest.delimiter.is_ascii() {
            return Err(
                TabletalkError::Config("ingest.delimiter must be an ASCII character".to_string())
                    .into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
