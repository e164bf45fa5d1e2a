//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{embeddings, endpoints, graph, llm, rag};
use crate::{ConfigError, GraphConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Completion backend
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Knowledge search
    #[serde(default)]
    pub rag: RagConfig,

    /// Conversation store (ScyllaDB)
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Graph execution limits
    #[serde(default)]
    pub graph: GraphSettings,

    /// Models, thresholds and prompts
    #[serde(default)]
    pub graph_config: GraphConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed origins; empty allows only http://localhost:3000
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// OpenAI-compatible completion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Falls back to `OPENAI_API_KEY` when unset
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    endpoints::OPENAI_DEFAULT.to_string()
}

fn default_api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
}

fn default_temperature() -> f32 {
    llm::DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> usize {
    llm::DEFAULT_MAX_TOKENS
}

fn default_llm_timeout() -> u64 {
    llm::DEFAULT_TIMEOUT_SECS
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: default_api_key(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Embedding backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dim")]
    pub dimension: usize,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    embeddings::DEFAULT_MODEL.to_string()
}

fn default_embedding_dim() -> usize {
    embeddings::DEFAULT_DIM
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: default_api_key(),
            model: default_embedding_model(),
            dimension: default_embedding_dim(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Knowledge search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Use Qdrant (false = in-memory knowledge base)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_qdrant_endpoint")]
    pub qdrant_endpoint: String,

    #[serde(default = "default_collection")]
    pub qdrant_collection: String,

    #[serde(default)]
    pub qdrant_api_key: Option<String>,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Directory of YAML/JSON knowledge files indexed at startup
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: String,
}

fn default_qdrant_endpoint() -> String {
    endpoints::QDRANT_DEFAULT.to_string()
}

fn default_collection() -> String {
    rag::DEFAULT_COLLECTION.to_string()
}

fn default_similarity_threshold() -> f32 {
    rag::DEFAULT_SIMILARITY_THRESHOLD
}

fn default_max_results() -> usize {
    rag::DEFAULT_MAX_RESULTS
}

fn default_knowledge_dir() -> String {
    rag::DEFAULT_KNOWLEDGE_DIR.to_string()
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            qdrant_endpoint: default_qdrant_endpoint(),
            qdrant_collection: default_collection(),
            qdrant_api_key: None,
            similarity_threshold: default_similarity_threshold(),
            max_results: default_max_results(),
            knowledge_dir: default_knowledge_dir(),
        }
    }
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec![endpoints::SCYLLA_DEFAULT.to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "hermes".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Expose `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Limits applied while running the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Timeout for each external call
    #[serde(default = "default_collaborator_timeout")]
    pub collaborator_timeout_ms: u64,

    /// Prior exchanges included in the response prompt
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Extra attempts for knowledge search and response generation
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_collaborator_timeout() -> u64 {
    graph::DEFAULT_COLLABORATOR_TIMEOUT_MS
}

fn default_history_limit() -> usize {
    graph::DEFAULT_HISTORY_LIMIT
}

fn default_retries() -> u32 {
    graph::DEFAULT_RETRIES
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            collaborator_timeout_ms: default_collaborator_timeout(),
            history_limit: default_history_limit(),
            retries: default_retries(),
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

fn check_unit_range(field: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("Must be between 0.0 and 1.0, got {}", value)))
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_llm()?;
        self.validate_rag()?;
        self.validate_graph()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(invalid("server.port", "Port cannot be 0"));
        }

        if server.timeout_seconds == 0 {
            return Err(invalid(
                "server.timeout_seconds",
                "Timeout must be at least 1 second",
            ));
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 Cross-origin requests will be rejected."
            );
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", self.llm.temperature),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens", "Must be at least 1"));
        }

        if self.llm.timeout_secs == 0 {
            return Err(invalid("llm.timeout_secs", "Timeout must be at least 1 second"));
        }

        if self.embeddings.dimension == 0 {
            return Err(invalid("embeddings.dimension", "Must be at least 1"));
        }

        if self.embeddings.timeout_secs == 0 {
            return Err(invalid(
                "embeddings.timeout_secs",
                "Timeout must be at least 1 second",
            ));
        }

        if self.environment.is_production() && self.llm.api_key.is_none() {
            tracing::warn!("No LLM API key configured; completions will fail");
        }

        Ok(())
    }

    fn validate_rag(&self) -> Result<(), ConfigError> {
        check_unit_range("rag.similarity_threshold", self.rag.similarity_threshold)?;

        if self.rag.max_results == 0 {
            return Err(invalid("rag.max_results", "Must be at least 1"));
        }

        Ok(())
    }

    fn validate_graph(&self) -> Result<(), ConfigError> {
        for (field, value) in self.graph_config.threshold_fields() {
            check_unit_range(field, value)?;
        }

        if self.graph.collaborator_timeout_ms == 0 {
            return Err(invalid(
                "graph.collaborator_timeout_ms",
                "Timeout must be at least 1ms",
            ));
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (HERMES_ prefix, `__` between sections)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with an explicit config directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("HERMES")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Threshold;
    use std::fs;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.llm.max_tokens, 500);
        assert_eq!(settings.rag.similarity_threshold, 0.7);
        assert_eq!(settings.rag.max_results, 3);
        assert_eq!(settings.graph.history_limit, 10);
        assert_eq!(settings.graph.retries, 1);
        assert!(!settings.persistence.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();

        settings.server.port = 0;
        assert!(settings.validate().is_err());
        settings.server.port = 8080;

        settings.server.timeout_seconds = 0;
        assert!(settings.validate().is_err());
        settings.server.timeout_seconds = 30;

        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_threshold_validation() {
        let mut settings = Settings::default();

        settings.graph_config.thresholds.data_collection = 1.2;
        match settings.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "graph_config.thresholds.data_collection");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
        settings.graph_config.thresholds.data_collection = 0.6;

        settings.graph_config.thresholds.intent_confidence = -0.1;
        assert!(settings.validate().is_err());
        settings.graph_config.thresholds.intent_confidence = 0.8;

        settings.rag.similarity_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rag_and_graph_validation() {
        let mut settings = Settings::default();
        settings.rag.max_results = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.graph.collaborator_timeout_ms = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.llm.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings =
            load_settings_from(dir.path().to_str().unwrap(), Some("staging")).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.graph_config, GraphConfig::default());
    }

    #[test]
    fn test_load_from_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.yaml"),
            "server:\n  port: 9090\ngraph_config:\n  thresholds:\n    data_collection: 0.5\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("production.yaml"),
            "environment: production\nserver:\n  cors_origins:\n    - https://hermes.dev\n",
        )
        .unwrap();

        let settings =
            load_settings_from(dir.path().to_str().unwrap(), Some("production")).unwrap();
        assert_eq!(settings.environment, RuntimeEnvironment::Production);
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.cors_origins, vec!["https://hermes.dev"]);
        assert_eq!(
            settings.graph_config.threshold_for(Threshold::DataCollection),
            0.5
        );
        assert_eq!(
            settings.graph_config.threshold_for(Threshold::HighInterest),
            0.75
        );
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.yaml"),
            "rag:\n  max_results: 0\n",
        )
        .unwrap();
        assert!(load_settings_from(dir.path().to_str().unwrap(), None).is_err());
    }
}
