use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::AuditEvent;
use crate::metrics::AUDIT_EVENTS_LOST;

/// An event stamped with the moment it happened, not when it was persisted.
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

impl AuditEventEnvelope {
    fn now(event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Sending half of the audit pipeline.
///
/// Queue operations run synchronously inside SQLite transactions, so they use
/// [`AuditHandle::try_emit`]; a full buffer drops the event rather than stall a counter.
/// The writer exits once every clone is gone.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
}

impl AuditHandle {
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self { tx }
    }

    /// Queue an event, waiting for buffer space.
    pub async fn emit(&self, event: AuditEvent) {
        let event_type = event.event_type();
        if self.tx.send(AuditEventEnvelope::now(event)).await.is_err() {
            AUDIT_EVENTS_LOST.with_label_values(&["enqueue"]).inc();
            tracing::error!(event_type, "Audit writer is gone, event dropped");
        }
    }

    /// Queue an event without waiting. Returns false if it was dropped.
    pub fn try_emit(&self, event: AuditEvent) -> bool {
        let event_type = event.event_type();
        match self.tx.try_send(AuditEventEnvelope::now(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                AUDIT_EVENTS_LOST.with_label_values(&["enqueue"]).inc();
                tracing::warn!(event_type, "Audit buffer full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                AUDIT_EVENTS_LOST.with_label_values(&["enqueue"]).inc();
                tracing::error!(event_type, "Audit writer is gone, event dropped");
                false
            }
        }
    }
}
