//! Ticket issuing: daily numbering and wait estimates.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::QueueConfig;
use crate::counter::CounterStore;
use crate::metrics::TICKETS_ISSUED;
use crate::ticket::{
    CreateTicketRequest, Ticket, TicketFilter, TicketPriority, TicketStatus, TicketStore,
};

use super::{QueueClock, QueueError, QueueGate};

/// Longest accepted customer name or contact.
const MAX_FIELD_LEN: usize = 100;
const MAX_NOTES_LEN: usize = 500;

/// Customer request for a new ticket. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateTicket {
    pub priority: TicketPriority,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub notes: Option<String>,
}

/// Allocates sequential queue numbers for the current day.
pub struct TicketIssuer {
    tickets: Arc<dyn TicketStore>,
    counters: Arc<dyn CounterStore>,
    clock: QueueClock,
    start_number: i64,
    default_service_time: i64,
    gate: QueueGate,
}

impl TicketIssuer {
    pub fn new(
        config: &QueueConfig,
        clock: QueueClock,
        tickets: Arc<dyn TicketStore>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            tickets,
            counters,
            clock,
            start_number: config.start_number,
            default_service_time: config.default_service_time_minutes,
            gate: QueueGate::new(),
        }
    }

    pub fn with_gate(mut self, gate: QueueGate) -> Self {
        self.gate = gate;
        self
    }

    /// Issue the next ticket of today.
    pub fn generate(&self, request: GenerateTicket) -> Result<Ticket, QueueError> {
        let customer_name = normalize(request.customer_name, "customerName", MAX_FIELD_LEN)?;
        let customer_contact =
            normalize(request.customer_contact, "customerContact", MAX_FIELD_LEN)?;
        let notes = normalize(request.notes, "notes", MAX_NOTES_LEN)?;

        let _gate = self.gate.shared()?;
        let day = self.clock.today();
        let estimated_wait_time = self.estimate_wait(day, request.priority)?;

        let ticket = self.tickets.create(CreateTicketRequest {
            queue_date: day,
            start_number: self.start_number,
            priority: request.priority,
            customer_name,
            customer_contact,
            notes,
            estimated_wait_time: Some(estimated_wait_time),
        })?;

        TICKETS_ISSUED
            .with_label_values(&[ticket.priority.as_str()])
            .inc();

        info!(
            ticket_id = ticket.id,
            queue_number = ticket.queue_number,
            priority = ticket.priority.as_str(),
            estimated_wait = estimated_wait_time,
            "Issued ticket"
        );

        Ok(ticket)
    }

    /// Minutes a new ticket of `priority` is expected to wait.
    ///
    /// Tickets ahead are the live WAITING ones that will be dispatched first
    /// (same or higher priority), shared across active counters.
    pub fn estimate_wait(&self, day: NaiveDate, priority: TicketPriority) -> Result<i64, QueueError> {
        let ahead = self.tickets.count(
            &TicketFilter::live_on(day)
                .with_status(TicketStatus::Waiting)
                .with_min_priority(priority),
        )?;

        let active: Vec<i64> = self
            .counters
            .list()?
            .into_iter()
            .filter(|c| c.is_active)
            .map(|c| c.estimated_service_time)
            .collect();

        let (lanes, service_time) = if active.is_empty() {
            (1, self.default_service_time)
        } else {
            let lanes = active.len() as i64;
            let total: i64 = active.iter().sum();
            (lanes, div_ceil(total, lanes))
        };

        Ok(div_ceil(ahead, lanes) * service_time)
    }
}

fn div_ceil(n: i64, d: i64) -> i64 {
    if d <= 0 {
        return n;
    }
    (n + d - 1) / d
}

/// Trim a free-text field; blank becomes `None`.
fn normalize(
    value: Option<String>,
    field: &str,
    max_len: usize,
) -> Result<Option<String>, QueueError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_len {
        return Err(QueueError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(Some(trimmed.to_string()))
}
