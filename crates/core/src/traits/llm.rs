//! Completion generator trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Single-shot completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "gpt-4o-mini")
    pub model: String,
    pub system_prompt: String,
    pub user_message: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_message: user_message.into(),
            temperature: 0.3,
            max_tokens: 500,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text completion backend
#[async_trait]
pub trait CompletionGenerator: Send + Sync {
    /// Generate a completion for the request
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Backend name for logs
    fn name(&self) -> &str;
}
