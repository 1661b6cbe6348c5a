use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;

/// One activity entry recorded after a successful mutating operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub user: Option<String>,
    pub action: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(action: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            user: None,
            action: action.into(),
            description: description.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Destination for activity records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &ActivityRecord) -> CoreResult<()>;
}

/// Publishes a record, swallowing sink failures: audit must never fail
/// the primary operation.
pub fn publish(sink: &dyn AuditSink, record: ActivityRecord) {
    if let Err(err) = sink.record(&record) {
        tracing::warn!(action = %record.action, error = %err, "audit record dropped");
    }
}

/// Default sink: emits records through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, record: &ActivityRecord) -> CoreResult<()> {
        tracing::info!(
            target: "kabisilya_core::audit",
            action = %record.action,
            user = record.user.as_deref().unwrap_or("-"),
            "{}",
            record.description
        );
        Ok(())
    }
}

/// Collects records in memory; used by tests and host-side inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ActivityRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for MemorySink {
    fn record(&self, record: &ActivityRecord) -> CoreResult<()> {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreError;

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn record(&self, _record: &ActivityRecord) -> CoreResult<()> {
            Err(CoreError::Validation("sink offline".into()))
        }
    }

    #[test]
    fn memory_sink_collects_records() {
        let sink = MemorySink::new();
        publish(&sink, ActivityRecord::new("debt:create", "created debt").with_user("admin"));
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "debt:create");
        assert_eq!(records[0].user.as_deref(), Some("admin"));
    }

    #[test]
    fn publish_swallows_sink_failures() {
        publish(&FailingSink, ActivityRecord::new("debt:create", "created debt"));
    }
}
