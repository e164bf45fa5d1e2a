//! Centralized defaults
//!
//! Single source for values referenced by more than one section of the
//! settings or by more than one crate.

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// OpenAI-compatible API base URL
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Qdrant vector store endpoint
    pub const QDRANT_DEFAULT: &str = "http://127.0.0.1:6334";

    /// ScyllaDB contact point
    pub const SCYLLA_DEFAULT: &str = "127.0.0.1:9042";
}

/// Language model defaults
pub mod llm {
    /// Default chat model for every graph role
    pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

    pub const DEFAULT_TEMPERATURE: f32 = 0.3;

    pub const DEFAULT_MAX_TOKENS: usize = 500;

    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Text returned when no completion could be produced
    pub const APOLOGY_RESPONSE: &str = "Lo siento, no pude procesar tu consulta.";
}

/// Embedding defaults
pub mod embeddings {
    pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

    pub const DEFAULT_DIM: usize = 1536;
}

/// Retrieval defaults
pub mod rag {
    /// Minimum similarity for a knowledge document to be used
    pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

    /// Maximum knowledge documents per turn
    pub const DEFAULT_MAX_RESULTS: usize = 3;

    pub const DEFAULT_COLLECTION: &str = "hermes_knowledge";

    pub const DEFAULT_KNOWLEDGE_DIR: &str = "knowledge";
}

/// Graph execution defaults
pub mod graph {
    /// Per external call timeout
    pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 15_000;

    /// Prior exchanges loaded into the response prompt
    pub const DEFAULT_HISTORY_LIMIT: usize = 10;

    /// Extra attempts for retryable nodes
    pub const DEFAULT_RETRIES: u32 = 1;
}
