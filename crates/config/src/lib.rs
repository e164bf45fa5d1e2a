//! Configuration management for the Hermes assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (HERMES_ prefix, `__` separator)
//!
//! The graph configuration (models, thresholds, prompt templates) lives in
//! [`GraphConfig`] and is read-only once the process has started.

pub mod constants;
pub mod graph;
pub mod prompts;
pub mod settings;

pub use graph::{
    render_prompt, GraphConfig, ModelRole, ModelsConfig, PromptRole, PromptsConfig, Threshold,
    ThresholdsConfig,
};
pub use settings::{
    load_settings, load_settings_from, EmbeddingsConfig, GraphSettings, LlmSettings, ObservabilityConfig,
    PersistenceConfig, RagConfig, RuntimeEnvironment, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for hermes_core::Error {
    fn from(err: ConfigError) -> Self {
        hermes_core::Error::Config(err.to_string())
    }
}
