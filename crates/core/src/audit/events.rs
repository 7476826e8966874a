use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::TicketPriority;

/// Actor recorded for mutations made by background loops.
pub const SYSTEM_ACTOR: &str = "system";

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketIssued {
        ticket_id: i64,
        queue_number: i64,
        /// Queue day (YYYY-MM-DD)
        queue_date: String,
        priority: TicketPriority,
        estimated_wait_time: Option<i64>,
    },
    TicketCalled {
        ticket_id: i64,
        queue_number: i64,
        counter_id: i64,
        user_id: String,
    },
    TicketCompleted {
        ticket_id: i64,
        queue_number: i64,
        counter_id: Option<i64>,
        user_id: String,
        /// Seconds between call and completion
        service_seconds: Option<i64>,
    },
    TicketSkipped {
        ticket_id: i64,
        queue_number: i64,
        counter_id: Option<i64>,
        user_id: String,
        service_seconds: Option<i64>,
    },

    // Counter administration
    CounterCreated {
        counter_id: i64,
        name: String,
        user_id: String,
    },
    CounterUpdated {
        counter_id: i64,
        user_id: String,
        /// Names of the fields present in the update
        changed_fields: Vec<String>,
    },
    CounterDeleted {
        counter_id: i64,
        user_id: String,
        /// Ticket force-finished before the delete, if the counter was busy
        #[serde(default, skip_serializing_if = "Option::is_none")]
        released_ticket_id: Option<i64>,
    },
    CounterToggled {
        counter_id: i64,
        user_id: String,
        is_active: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        released_ticket_id: Option<i64>,
    },

    // Maintenance
    CleanupRan {
        user_id: String,
        removed: u64,
        cutoff: DateTime<Utc>,
    },
    DailyReset {
        user_id: String,
        /// New queue day (YYYY-MM-DD)
        day: String,
        counters_cleared: u64,
        tickets_expired: u64,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TicketIssued { .. } => "ticket_issued",
            Self::TicketCalled { .. } => "ticket_called",
            Self::TicketCompleted { .. } => "ticket_completed",
            Self::TicketSkipped { .. } => "ticket_skipped",
            Self::CounterCreated { .. } => "counter_created",
            Self::CounterUpdated { .. } => "counter_updated",
            Self::CounterDeleted { .. } => "counter_deleted",
            Self::CounterToggled { .. } => "counter_toggled",
            Self::CleanupRan { .. } => "cleanup_ran",
            Self::DailyReset { .. } => "daily_reset",
        }
    }

    /// Extract ticket_id if this event is ticket-related
    pub fn ticket_id(&self) -> Option<i64> {
        match self {
            Self::TicketIssued { ticket_id, .. }
            | Self::TicketCalled { ticket_id, .. }
            | Self::TicketCompleted { ticket_id, .. }
            | Self::TicketSkipped { ticket_id, .. } => Some(*ticket_id),
            Self::CounterDeleted {
                released_ticket_id, ..
            }
            | Self::CounterToggled {
                released_ticket_id, ..
            } => *released_ticket_id,
            _ => None,
        }
    }

    /// Extract counter_id if this event involves a counter
    pub fn counter_id(&self) -> Option<i64> {
        match self {
            Self::TicketCalled { counter_id, .. }
            | Self::CounterCreated { counter_id, .. }
            | Self::CounterUpdated { counter_id, .. }
            | Self::CounterDeleted { counter_id, .. }
            | Self::CounterToggled { counter_id, .. } => Some(*counter_id),
            Self::TicketCompleted { counter_id, .. } | Self::TicketSkipped { counter_id, .. } => {
                *counter_id
            }
            _ => None,
        }
    }

    /// Extract user_id if this event has an actor
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::TicketCalled { user_id, .. }
            | Self::TicketCompleted { user_id, .. }
            | Self::TicketSkipped { user_id, .. }
            | Self::CounterCreated { user_id, .. }
            | Self::CounterUpdated { user_id, .. }
            | Self::CounterDeleted { user_id, .. }
            | Self::CounterToggled { user_id, .. }
            | Self::CleanupRan { user_id, .. }
            | Self::DailyReset { user_id, .. } => Some(user_id),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<i64>,
    pub counter_id: Option<i64>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}
