use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};
use crate::metrics::AUDIT_EVENTS_LOST;

/// Events persisted per wake-up before yielding back to the runtime.
const MAX_BATCH: usize = 64;

impl From<AuditEventEnvelope> for AuditRecord {
    fn from(envelope: AuditEventEnvelope) -> Self {
        let event = envelope.event;
        Self {
            id: 0,
            timestamp: envelope.timestamp,
            event_type: event.event_type().to_string(),
            ticket_id: event.ticket_id(),
            counter_id: event.counter_id(),
            user_id: event.user_id().map(String::from),
            data: event,
        }
    }
}

/// Receiving half of the audit pipeline: persists whatever handles send.
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Persist events until every [`AuditHandle`] is dropped and the buffer is empty.
    pub async fn run(mut self) {
        tracing::info!("Audit writer started");
        let mut batch = Vec::with_capacity(MAX_BATCH);
        let mut written: u64 = 0;

        while self.rx.recv_many(&mut batch, MAX_BATCH).await > 0 {
            for envelope in batch.drain(..) {
                let record = AuditRecord::from(envelope);
                match self.store.insert(&record) {
                    Ok(_) => written += 1,
                    Err(e) => {
                        AUDIT_EVENTS_LOST.with_label_values(&["insert"]).inc();
                        tracing::error!(
                            event_type = %record.event_type,
                            error = %e,
                            "Failed to persist audit event"
                        );
                    }
                }
            }
        }

        tracing::info!(written, "Audit writer drained, shutting down");
    }
}

/// Wire a handle to a writer over a bounded buffer.
///
/// Spawn the writer with `tokio::spawn(writer.run())` and clone the handle
/// into every component that records events.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}
