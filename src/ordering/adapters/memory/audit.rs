//! Audit sink that keeps records in memory for inspection.

use crate::ordering::ports::{AuditSink, MutationRecord};
use std::sync::{Arc, Mutex};

/// Sink collecting every record for later assertion in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuditSink {
    records: Arc<Mutex<Vec<MutationRecord>>>,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the records received so far.
    #[must_use]
    pub fn records(&self) -> Vec<MutationRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, record: MutationRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
