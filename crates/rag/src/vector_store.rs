//! Vector Store using Qdrant
//!
//! Dense vector storage and similarity search over the knowledge base.

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        value::Kind, CreateCollectionBuilder, Distance, PointStruct, ScoredPoint,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    },
    Qdrant,
};
use std::collections::HashMap;
use uuid::Uuid;

use hermes_config::constants::{embeddings, endpoints, rag};
use hermes_config::{EmbeddingsConfig, RagConfig};
use hermes_core::{KnowledgeDocument, KnowledgeSearch};

use crate::knowledge_loader::{KnowledgeEntry, KnowledgeIndex};
use crate::RagError;

/// Vector store configuration
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub endpoint: String,
    pub collection: String,
    pub vector_dim: usize,
    pub distance: VectorDistance,
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::QDRANT_DEFAULT.to_string(),
            collection: rag::DEFAULT_COLLECTION.to_string(),
            vector_dim: embeddings::DEFAULT_DIM,
            distance: VectorDistance::Cosine,
            api_key: None,
        }
    }
}

impl VectorStoreConfig {
    pub fn from_settings(rag: &RagConfig, embeddings: &EmbeddingsConfig) -> Self {
        Self {
            endpoint: rag.qdrant_endpoint.clone(),
            collection: rag.qdrant_collection.clone(),
            vector_dim: embeddings.dimension,
            distance: VectorDistance::Cosine,
            api_key: rag.qdrant_api_key.clone(),
        }
    }
}

/// Distance metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorDistance {
    Cosine,
    Euclidean,
    DotProduct,
}

impl From<VectorDistance> for Distance {
    fn from(d: VectorDistance) -> Self {
        match d {
            VectorDistance::Cosine => Distance::Cosine,
            VectorDistance::Euclidean => Distance::Euclid,
            VectorDistance::DotProduct => Distance::Dot,
        }
    }
}

/// Qdrant point id for a knowledge entry id
///
/// Qdrant only accepts UUIDs or integers, so string ids are mapped through a
/// name-based UUID and the original id is kept in the payload.
fn point_id(doc_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, doc_id.as_bytes()).to_string()
}

/// Build a knowledge document from a scored point's payload
fn document_from_point(point: ScoredPoint) -> KnowledgeDocument {
    let mut fields: HashMap<String, String> = HashMap::new();
    for (k, v) in point.payload {
        if let Some(Kind::StringValue(s)) = v.kind {
            fields.insert(k, s);
        }
    }

    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    KnowledgeDocument {
        id: take("doc_id"),
        title: take("title"),
        content: take("content"),
        category: take("category"),
        similarity: point.score,
    }
}

/// Qdrant-backed knowledge store
pub struct VectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
}

impl VectorStore {
    pub async fn new(config: VectorStoreConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.endpoint);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }

        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create collection if not exists
    pub async fn ensure_collection(&self) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection).vectors_config(
                        VectorParamsBuilder::new(
                            self.config.vector_dim as u64,
                            Distance::from(self.config.distance),
                        ),
                    ),
                )
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;

            tracing::info!(collection = %self.config.collection, "Created Qdrant collection");
        }

        Ok(())
    }

    /// Search by vector, returning at most `top_k` points above `threshold`
    pub async fn search_points(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>, RagError> {
        let request = SearchPointsBuilder::new(
            &self.config.collection,
            query_embedding.to_vec(),
            top_k as u64,
        )
        .score_threshold(threshold)
        .with_payload(true);

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        let mut documents: Vec<KnowledgeDocument> = results
            .result
            .into_iter()
            .map(document_from_point)
            .filter(|doc| doc.similarity >= threshold)
            .collect();

        // Qdrant already orders by score; keep the contract explicit
        documents.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        documents.truncate(top_k);

        Ok(documents)
    }
}

#[async_trait]
impl KnowledgeIndex for VectorStore {
    async fn upsert(
        &self,
        entries: &[KnowledgeEntry],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if entries.len() != embeddings.len() {
            return Err(RagError::VectorStore(
                "Document and embedding count mismatch".to_string(),
            ));
        }

        let points: Vec<PointStruct> = entries
            .iter()
            .zip(embeddings.iter())
            .map(|(entry, emb)| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert("doc_id".to_string(), entry.id.clone().into());
                payload.insert("title".to_string(), entry.title.clone().into());
                payload.insert("content".to_string(), entry.content.clone().into());
                payload.insert("category".to_string(), entry.category.clone().into());

                PointStruct::new(point_id(&entry.id), emb.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points))
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl KnowledgeSearch for VectorStore {
    async fn search(
        &self,
        query_embedding: &[f32],
        similarity_threshold: f32,
        max_results: usize,
    ) -> hermes_core::Result<Vec<KnowledgeDocument>> {
        self.search_points(query_embedding, similarity_threshold, max_results)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = VectorStoreConfig::default();
        assert_eq!(config.vector_dim, 1536);
        assert_eq!(config.collection, "hermes_knowledge");
        assert_eq!(config.distance, VectorDistance::Cosine);
    }

    #[test]
    fn test_point_id_is_stable_uuid() {
        let a = point_id("landing");
        assert_eq!(a, point_id("landing"));
        assert_ne!(a, point_id("ecommerce"));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_document_from_point() {
        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert("doc_id".to_string(), "landing".to_string().into());
        payload.insert("title".to_string(), "Landing Pages".to_string().into());
        payload.insert("content".to_string(), "Desde $120.000".to_string().into());
        payload.insert("category".to_string(), "servicios".to_string().into());

        let point = ScoredPoint {
            payload,
            score: 0.82,
            ..Default::default()
        };
        let doc = document_from_point(point);
        assert_eq!(doc.id, "landing");
        assert_eq!(doc.title, "Landing Pages");
        assert_eq!(doc.category, "servicios");
        assert!((doc.similarity - 0.82).abs() < 1e-6);
    }
}
