//! Audit sink port plus in-memory implementations for tests/dev.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::entry::{AuditAction, AuditEntry};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditSinkError {
    /// The sink rejected or could not accept the entry.
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Append-only audit port.
///
/// Callers treat recording as a side channel: the returned error carries the
/// failure, but a failed write never aborts the primary operation that
/// produced the entry.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditSinkError>;
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn record(&self, entry: AuditEntry) -> Result<(), AuditSinkError> {
        (**self).record(entry)
    }
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn by_action(&self, action: AuditAction) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditSinkError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AuditSinkError::Unavailable("lock poisoned".to_string()))?;
        entries.push(entry);
        Ok(())
    }
}

/// Sink that refuses every write.
///
/// Used to exercise the best-effort posture of callers: primary operations
/// must succeed even when every audit write fails.
#[derive(Debug, Default)]
pub struct RejectingAuditSink;

impl AuditSink for RejectingAuditSink {
    fn record(&self, _entry: AuditEntry) -> Result<(), AuditSinkError> {
        Err(AuditSinkError::Unavailable(
            "sink rejects all writes".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mostrador_core::OperatorId;

    #[test]
    fn in_memory_sink_appends_and_filters() {
        let sink = InMemoryAuditSink::new();
        let actor = OperatorId::new();
        sink.record(AuditEntry::new(
            actor,
            AuditAction::TicketCreate,
            "ticket opened",
            Utc::now(),
        ))
        .unwrap();
        sink.record(AuditEntry::new(
            actor,
            AuditAction::SaleCreate,
            "sale committed",
            Utc::now(),
        ))
        .unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.by_action(AuditAction::SaleCreate).len(), 1);
    }

    #[test]
    fn rejecting_sink_always_fails() {
        let sink = RejectingAuditSink;
        let err = sink
            .record(AuditEntry::new(
                OperatorId::new(),
                AuditAction::SaleVoid,
                "x",
                Utc::now(),
            ))
            .unwrap_err();
        assert!(matches!(err, AuditSinkError::Unavailable(_)));
    }
}
