//! Collaborator traits
//!
//! The orchestrator talks to the outside world only through these traits,
//! so backends can be swapped and mocked in tests.
//!
//! ```text
//! Language Models:
//!   - CompletionGenerator: system prompt + user message → text
//!
//! Retrieval:
//!   - Embedder: text → dense vector
//!   - KnowledgeSearch: vector → ranked knowledge documents
//! ```

mod llm;
mod retriever;

pub use llm::{CompletionGenerator, CompletionRequest};
pub use retriever::{Embedder, KnowledgeDocument, KnowledgeSearch};
