//! Core types for the Hermes sales assistant
//!
//! This crate provides the foundational types used across all other crates:
//! - The per-turn graph state and its transition helpers
//! - Collaborator traits (completion, embeddings, knowledge search)
//! - Text preparation helpers
//! - Error types

pub mod error;
pub mod state;
pub mod text;
pub mod traits;
pub mod transitions;

pub use error::{Error, Result};
pub use state::{
    ActionTag, CollectedData, CollectionStage, DataCollectionProgress, ExecutionMetadata,
    GraphState, IntentCategory, IntentClassification, IntentType, InterestLevel, InterestSignal,
    InterestTier, KnowledgeContext, NextActions, NodeError, NodeExecution, RelevantDoc,
    UserContext,
};
pub use text::{format_final_response, prepare_text_for_embedding};
pub use traits::{CompletionGenerator, CompletionRequest, Embedder, KnowledgeDocument, KnowledgeSearch};
pub use transitions::{create_initial_state, record_error, record_node_execution, validate_state};
