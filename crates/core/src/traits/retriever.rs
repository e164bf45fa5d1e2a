//! Embedding and knowledge search traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Knowledge base entry returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    /// Similarity to the query, 0.0 - 1.0
    pub similarity: f32,
}

/// Text embedding backend
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text; deterministic per model version
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimension
    fn dim(&self) -> usize;
}

/// Semantic search over the knowledge base
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// Documents with similarity >= `similarity_threshold`, ordered by
    /// descending similarity, at most `max_results`.
    async fn search(
        &self,
        query_embedding: &[f32],
        similarity_threshold: f32,
        max_results: usize,
    ) -> Result<Vec<KnowledgeDocument>>;
}
