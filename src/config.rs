//! Application configuration
//!
//! Loaded from a TOML file into typed sections with serde defaults, then
//! passed explicitly into the server and orchestrator. Secrets never live in
//! the file: it names the environment variable holding the API key, which is
//! resolved at analyze time. Per-request overrides merge over this config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub data: DataSection,
}

/// Reasoning backend section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI-compatible endpoint base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Per reasoning call timeout; a timed-out call degrades, it does not
    /// fail the stage
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
}

/// Pipeline tuning section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    /// Rating gap between the researchers that triggers a debate
    #[serde(default = "default_debate_threshold")]
    pub debate_threshold: f64,
    #[serde(default = "default_max_debate_rounds")]
    pub max_debate_rounds: u32,
}

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

/// Market data provider section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSection {
    #[serde(default = "default_data_base_url")]
    pub base_url: String,
    #[serde(default = "default_data_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "Qwen/Qwen2.5-7B-Instruct".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.siliconflow.cn/v1".to_string()
}

fn default_api_key_env() -> String {
    "TRADECOUNCIL_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_task_timeout() -> u64 {
    90
}

fn default_debate_threshold() -> f64 {
    3.0
}

fn default_max_debate_rounds() -> u32 {
    2
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_data_base_url() -> String {
    "http://127.0.0.1:8100/api".to_string()
}

fn default_data_timeout() -> u64 {
    10
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_llm_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: None,
            task_timeout_secs: default_task_timeout(),
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            debate_threshold: default_debate_threshold(),
            max_debate_rounds: default_max_debate_rounds(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            base_url: default_data_base_url(),
            timeout_secs: default_data_timeout(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.debate_threshold < 0.0 || self.pipeline.debate_threshold > 10.0 {
            return Err(ConfigError::InvalidConfig(format!(
                "debate_threshold {} must lie on the 10-point scale",
                self.pipeline.debate_threshold
            )));
        }
        if self.pipeline.max_debate_rounds == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_debate_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the API key from the configured environment variable
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }
}
