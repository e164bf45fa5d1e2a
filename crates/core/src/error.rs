//! Error types shared across crates

use thiserror::Error;

/// Core error type
///
/// Crate-specific errors (`LlmError`, `RagError`, ...) convert into this at the
/// trait boundary so the orchestrator sees a single taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed or incomplete turn input
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Whether the error came from an external collaborator call
    /// (search, embedding, completion) rather than from the input.
    pub fn is_collaborator(&self) -> bool {
        matches!(
            self,
            Error::Llm(_) | Error::Embedding(_) | Error::Search(_) | Error::Timeout(_)
        )
    }
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_classification() {
        assert!(Error::Llm("boom".into()).is_collaborator());
        assert!(Error::Timeout(100).is_collaborator());
        assert!(!Error::Validation("empty".into()).is_collaborator());
        assert!(!Error::Persistence("down".into()).is_collaborator());
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::Timeout(250).to_string(), "Timed out after 250ms");
    }
}
