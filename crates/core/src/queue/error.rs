//! Error taxonomy shared by the queue services.

use thiserror::Error;

use crate::counter::CounterError;
use crate::ticket::TicketError;

/// Errors returned by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The referenced ticket or counter does not exist (or is not live).
    #[error("{0}")]
    NotFound(String),

    /// The entity exists but is in the wrong state for the operation.
    #[error("{0}")]
    InvalidState(String),

    /// Lost a race with a concurrent caller too many times.
    #[error("{0}")]
    Conflict(String),

    /// Nothing to hand out (e.g. no ticket waiting).
    #[error("{0}")]
    Unavailable(String),

    /// Request fields failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl QueueError {
    pub fn ticket_not_found(id: i64) -> Self {
        QueueError::NotFound(format!("Ticket not found: {}", id))
    }

    pub fn counter_not_found(id: i64) -> Self {
        QueueError::NotFound(format!("Counter not found: {}", id))
    }

    /// Short machine-readable kind, used for metric labels and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            QueueError::NotFound(_) => "not_found",
            QueueError::InvalidState(_) => "invalid_state",
            QueueError::Conflict(_) => "conflict",
            QueueError::Unavailable(_) => "unavailable",
            QueueError::InvalidInput(_) => "invalid_input",
            QueueError::Storage(_) => "storage",
        }
    }
}

impl From<TicketError> for QueueError {
    fn from(e: TicketError) -> Self {
        match e {
            TicketError::NotFound(id) => QueueError::ticket_not_found(id),
            TicketError::InvalidState { .. } => QueueError::InvalidState(e.to_string()),
            TicketError::Database(msg) => QueueError::Storage(msg),
        }
    }
}

impl From<CounterError> for QueueError {
    fn from(e: CounterError) -> Self {
        match e {
            CounterError::NotFound(id) => QueueError::counter_not_found(id),
            CounterError::Database(msg) => QueueError::Storage(msg),
        }
    }
}
