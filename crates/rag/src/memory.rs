//! In-memory knowledge base with brute-force cosine search

use async_trait::async_trait;
use parking_lot::RwLock;

use hermes_core::{KnowledgeDocument, KnowledgeSearch};

use crate::knowledge_loader::{KnowledgeEntry, KnowledgeIndex};
use crate::RagError;

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

struct StoredEntry {
    entry: KnowledgeEntry,
    embedding: Vec<f32>,
}

#[derive(Default)]
pub struct InMemoryKnowledgeBase {
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry by id
    pub fn insert(&self, entry: KnowledgeEntry, embedding: Vec<f32>) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|stored| stored.entry.id == entry.id) {
            Some(stored) => {
                stored.entry = entry;
                stored.embedding = embedding;
            }
            None => entries.push(StoredEntry { entry, embedding }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KnowledgeIndex for InMemoryKnowledgeBase {
    async fn upsert(
        &self,
        entries: &[KnowledgeEntry],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if entries.len() != embeddings.len() {
            return Err(RagError::Index(
                "Document and embedding count mismatch".to_string(),
            ));
        }
        for (entry, embedding) in entries.iter().zip(embeddings) {
            self.insert(entry.clone(), embedding.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeSearch for InMemoryKnowledgeBase {
    async fn search(
        &self,
        query_embedding: &[f32],
        similarity_threshold: f32,
        max_results: usize,
    ) -> hermes_core::Result<Vec<KnowledgeDocument>> {
        let mut results: Vec<KnowledgeDocument> = self
            .entries
            .read()
            .iter()
            .filter_map(|stored| {
                let similarity = cosine_similarity(query_embedding, &stored.embedding);
                (similarity >= similarity_threshold).then(|| KnowledgeDocument {
                    id: stored.entry.id.clone(),
                    title: stored.entry.title.clone(),
                    content: stored.entry.content.clone(),
                    category: stored.entry.category.clone(),
                    similarity,
                })
            })
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(max_results);
        Ok(results)
    }
}
