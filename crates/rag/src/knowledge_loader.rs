//! Knowledge base loader
//!
//! Reads knowledge documents from YAML/JSON files, embeds them and writes
//! them into a [`KnowledgeIndex`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use hermes_core::Embedder;

use crate::RagError;

/// Knowledge document format for YAML/JSON files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub title: String,
    /// Embedded as `title: content`
    pub content: String,
    /// e.g. "servicios", "precios", "portfolio"
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "general".to_string()
}

impl KnowledgeEntry {
    /// Text that gets embedded for this entry
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.title, self.content)
    }
}

/// Knowledge base file format
#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeFile {
    #[serde(default)]
    pub version: Option<String>,
    pub documents: Vec<KnowledgeEntry>,
}

/// Destination for embedded knowledge entries
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    async fn upsert(
        &self,
        entries: &[KnowledgeEntry],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError>;
}

pub struct KnowledgeLoader;

impl KnowledgeLoader {
    /// Read every YAML/JSON file in `knowledge_dir`
    ///
    /// A missing directory yields no entries. Files that fail to parse are
    /// logged and skipped.
    pub fn read_directory(knowledge_dir: &Path) -> Result<Vec<KnowledgeEntry>, RagError> {
        if !knowledge_dir.exists() {
            tracing::warn!(
                path = %knowledge_dir.display(),
                "Knowledge directory does not exist"
            );
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut paths: Vec<_> = std::fs::read_dir(knowledge_dir)
            .map_err(|e| RagError::Index(format!("Failed to read directory: {}", e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        for path in paths {
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !matches!(extension, "yaml" | "yml" | "json") {
                continue;
            }

            match Self::read_file(&path) {
                Ok(file) => {
                    tracing::info!(
                        file = %path.display(),
                        documents = file.documents.len(),
                        "Loaded knowledge file"
                    );
                    entries.extend(file.documents);
                }
                Err(e) => {
                    tracing::error!(
                        file = %path.display(),
                        error = %e,
                        "Failed to load knowledge file"
                    );
                }
            }
        }

        Ok(entries)
    }

    /// Parse a single knowledge file
    pub fn read_file(path: &Path) -> Result<KnowledgeFile, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Index(format!("Failed to read file: {}", e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| RagError::Index(format!("JSON parse error: {}", e))),
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| RagError::Index(format!("YAML parse error: {}", e))),
            _ => Err(RagError::Index(format!(
                "Unsupported file type: {}",
                extension
            ))),
        }
    }

    /// Embed `entries` and write them into `index`
    ///
    /// Returns the number of entries indexed.
    pub async fn index(
        entries: &[KnowledgeEntry],
        embedder: &dyn Embedder,
        index: &dyn KnowledgeIndex,
    ) -> Result<usize, RagError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut embeddings = Vec::with_capacity(entries.len());
        for entry in entries {
            let embedding = embedder
                .embed(&entry.embedding_text())
                .await
                .map_err(|e| RagError::Embedding(format!("{}: {}", entry.id, e)))?;
            embeddings.push(embedding);
        }

        index.upsert(entries, &embeddings).await?;

        tracing::info!(documents = entries.len(), "Knowledge base indexed");
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryKnowledgeBase;
    use hermes_core::KnowledgeSearch;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> hermes_core::Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dim(&self) -> usize {
            2
        }
    }

    const SAMPLE_YAML: &str = r#"
version: "1"
documents:
  - id: landing
    title: Landing Pages
    content: Páginas de una sola sección desde $120.000
    category: servicios
  - id: faq
    title: Plazos
    content: Una landing se entrega en dos semanas
"#;

    #[test]
    fn test_read_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("servicios.yaml"), SAMPLE_YAML).unwrap();
        std::fs::write(dir.path().join("notas.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("roto.json"), "{not json").unwrap();

        let entries = KnowledgeLoader::read_directory(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "landing");
        assert_eq!(entries[1].category, "general");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let entries =
            KnowledgeLoader::read_directory(Path::new("/definitely/not/here")).unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_index_into_memory() {
        let file: KnowledgeFile = serde_yaml::from_str(SAMPLE_YAML).unwrap();
        let kb = InMemoryKnowledgeBase::new();

        let count = KnowledgeLoader::index(&file.documents, &LengthEmbedder, &kb)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(kb.len(), 2);

        let results = kb.search(&[1.0, 0.0], 0.0, 5).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
