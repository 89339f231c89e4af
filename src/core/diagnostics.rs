//! Diagnostic sink implementations.
//!
//! Every lifecycle stage and every swallowed observer fault is written to the
//! `tracing` pipeline; a [`DiagnosticSink`] can additionally retain structured
//! records for inspection.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::WorkItemMeta;
use crate::util::clock::now_ms;

/// Structured diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// Event name (enqueued, dequeued, running, completed, faulted,
    /// observer_fault, stopped, disposed).
    pub event: String,
    /// Related work item identifier.
    pub work_item_id: Option<String>,
    /// Related work item display name.
    pub display_name: Option<String>,
    /// Queue depth observed when the record was produced.
    pub queue_depth: usize,
    /// Elapsed execution time, where applicable.
    pub elapsed_ms: Option<u128>,
    /// Additional context such as an error message.
    pub detail: Option<String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Diagnostic sink abstraction.
pub trait DiagnosticSink: Send + Sync {
    /// Record a diagnostic event.
    fn record(&self, record: DiagnosticRecord);
}

/// Bounded in-memory sink for testing and dev.
///
/// Cloning shares the underlying buffer.
#[derive(Clone)]
pub struct InMemoryDiagnosticSink {
    records: Arc<Mutex<VecDeque<DiagnosticRecord>>>,
    max_records: usize,
}

impl InMemoryDiagnosticSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(max_records.min(1024)))),
            max_records,
        }
    }

    /// Retrieve a snapshot of stored records.
    #[must_use]
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Records whose event name equals `event`.
    #[must_use]
    pub fn records_for(&self, event: &str) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.event == event)
            .cloned()
            .collect()
    }
}

impl DiagnosticSink for InMemoryDiagnosticSink {
    fn record(&self, record: DiagnosticRecord) {
        if self.max_records == 0 {
            return;
        }
        let mut records = self.records.lock();
        if records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record);
    }
}

/// Helper to build a diagnostic record from context.
pub fn build_diagnostic_record(
    event: impl Into<String>,
    item: Option<&WorkItemMeta>,
    queue_depth: usize,
    elapsed_ms: Option<u128>,
    detail: Option<String>,
) -> DiagnosticRecord {
    DiagnosticRecord {
        event: event.into(),
        work_item_id: item.map(|m| m.id.to_string()),
        display_name: item.and_then(|m| m.display_name.clone()),
        queue_depth,
        elapsed_ms,
        detail,
        created_at_ms: now_ms(),
    }
}
