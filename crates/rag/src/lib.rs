//! Retrieval for the Hermes assistant
//!
//! Features:
//! - OpenAI-compatible embeddings
//! - Dense vector search via Qdrant
//! - In-memory knowledge base for tests and deployments without Qdrant
//! - Knowledge base loading from YAML/JSON files

pub mod embeddings;
pub mod knowledge_loader;
pub mod memory;
pub mod vector_store;

pub use embeddings::{OpenAIEmbedder, OpenAIEmbeddingConfig};
pub use knowledge_loader::{KnowledgeEntry, KnowledgeFile, KnowledgeIndex, KnowledgeLoader};
pub use memory::{cosine_similarity, InMemoryKnowledgeBase};
pub use vector_store::{VectorDistance, VectorStore, VectorStoreConfig};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for hermes_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Embedding(_) => hermes_core::Error::Embedding(err.to_string()),
            _ => hermes_core::Error::Search(err.to_string()),
        }
    }
}
