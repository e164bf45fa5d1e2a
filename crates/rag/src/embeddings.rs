//! OpenAI-compatible embeddings
//!
//! Posts to `{endpoint}/embeddings` and returns the first vector.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use hermes_config::EmbeddingsConfig;
use hermes_core::Embedder;

use crate::RagError;

/// Embedding client configuration
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub embedding_dim: usize,
    pub timeout: Duration,
}

impl Default for OpenAIEmbeddingConfig {
    fn default() -> Self {
        Self::from_settings(&EmbeddingsConfig::default())
    }
}

impl OpenAIEmbeddingConfig {
    pub fn from_settings(settings: &EmbeddingsConfig) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            embedding_dim: settings.dimension,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

pub struct OpenAIEmbedder {
    client: Client,
    config: OpenAIEmbeddingConfig,
}

impl OpenAIEmbedder {
    pub fn new(config: OpenAIEmbeddingConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.config.endpoint.trim_end_matches('/'))
    }

    /// Embed a single text
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: text,
        };

        let mut builder = self.client.post(self.embeddings_url()).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "Embedding failed: {} - {}",
                status, text
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        first_embedding(embed_response, self.config.embedding_dim)
    }
}

fn first_embedding(response: EmbedResponse, expected_dim: usize) -> Result<Vec<f32>, RagError> {
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()))?;

    if embedding.len() != expected_dim {
        return Err(RagError::Embedding(format!(
            "Expected dimension {}, got {}",
            expected_dim,
            embedding.len()
        )));
    }

    Ok(embedding)
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> hermes_core::Result<Vec<f32>> {
        self.embed_text(text).await.map_err(Into::into)
    }

    fn dim(&self) -> usize {
        self.config.embedding_dim
    }
}
