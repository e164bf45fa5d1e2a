//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use hermes_config::Settings;

use crate::chat::ChatService;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Settings as loaded at startup
    pub config: Arc<Settings>,
    pub chat: Arc<ChatService>,
    /// Whether turns are stored in ScyllaDB rather than in memory
    pub persistent: bool,
    /// Whether knowledge search goes to Qdrant rather than memory
    pub vector_search: bool,
}

impl AppState {
    pub fn new(config: Settings, chat: ChatService) -> Self {
        Self {
            config: Arc::new(config),
            chat: Arc::new(chat),
            persistent: false,
            vector_search: false,
        }
    }

    pub fn with_backends(mut self, persistent: bool, vector_search: bool) -> Self {
        self.persistent = persistent;
        self.vector_search = vector_search;
        self
    }
}
