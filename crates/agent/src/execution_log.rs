//! Execution logger
//!
//! Records the start, success and failure of every graph node. One logger is
//! constructed at startup and shared (via `Arc`) by all turns; records from
//! concurrent turns interleave but are never lost or torn.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use hermes_core::{CollectionStage, IntentType, InterestTier};

/// Default number of records kept before the oldest are dropped
pub const DEFAULT_MAX_RECORDS: usize = 1_000;

/// Typed output of a successful node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeOutput {
    IntentClassified {
        intent: Option<IntentType>,
        confidence: f32,
    },
    KnowledgeRetrieved {
        documents: usize,
        query: String,
    },
    InterestScored {
        score: f32,
        level: InterestTier,
    },
    DataCollectionAdvanced {
        stage: CollectionStage,
        question: Option<String>,
    },
    ResponseGenerated {
        chars: usize,
    },
}

/// Handle returned by [`ExecutionLogger::begin`]
#[derive(Debug)]
pub struct CorrelationToken {
    node_name: String,
    id: String,
    started: Instant,
}

impl CorrelationToken {
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// `{node}-{unix millis}-{sequence}`
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// One finished node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub node_name: String,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    pub output: Option<NodeOutput>,
    pub error: Option<String>,
}

pub struct ExecutionLogger {
    records: Mutex<VecDeque<ExecutionRecord>>,
    sequence: AtomicU64,
    max_records: usize,
}

impl Default for ExecutionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionLogger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_RECORDS)
    }

    /// Logger keeping at most `max_records` records (at least one)
    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            sequence: AtomicU64::new(0),
            max_records: max_records.max(1),
        }
    }

    /// Mark the start of a node
    pub fn begin(&self, node_name: &str) -> CorrelationToken {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}-{}-{}", node_name, Utc::now().timestamp_millis(), sequence);

        tracing::debug!(node = %node_name, correlation_id = %id, "Node started");

        CorrelationToken {
            node_name: node_name.to_string(),
            id,
            started: Instant::now(),
        }
    }

    /// Record a successful node
    pub fn end(&self, token: CorrelationToken, output: NodeOutput) {
        let duration_ms = token.started.elapsed().as_millis() as u64;

        tracing::info!(
            node = %token.node_name,
            correlation_id = %token.id,
            duration_ms,
            output = ?output,
            "Node completed"
        );

        self.push(ExecutionRecord {
            node_name: token.node_name,
            correlation_id: token.id,
            timestamp: Utc::now(),
            duration_ms,
            success: true,
            output: Some(output),
            error: None,
        });
    }

    /// Record a failed node
    pub fn fail(&self, token: CorrelationToken, error: &str) {
        let duration_ms = token.started.elapsed().as_millis() as u64;

        tracing::warn!(
            node = %token.node_name,
            correlation_id = %token.id,
            duration_ms,
            error = %error,
            "Node failed"
        );

        self.push(ExecutionRecord {
            node_name: token.node_name,
            correlation_id: token.id,
            timestamp: Utc::now(),
            duration_ms,
            success: false,
            output: None,
            error: Some(error.to_string()),
        });
    }

    /// Snapshot of the records, oldest first
    pub fn history(&self) -> Vec<ExecutionRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn reset(&self) {
        self.records.lock().clear();
    }

    fn push(&self, record: ExecutionRecord) {
        let mut records = self.records.lock();
        if records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record);
    }
}
