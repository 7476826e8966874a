//! Ticket storage trait and types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::ticket::{Ticket, TicketPriority, TicketStatus};

/// Error type for ticket operations.
#[derive(Debug)]
pub enum TicketError {
    /// Ticket not found.
    NotFound(i64),
    /// Cannot perform operation due to current status.
    InvalidState {
        ticket_id: i64,
        current_status: TicketStatus,
        operation: String,
    },
    /// Database error.
    Database(String),
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketError::NotFound(id) => write!(f, "Ticket not found: {}", id),
            TicketError::InvalidState {
                ticket_id,
                current_status,
                operation,
            } => write!(
                f,
                "Cannot {} ticket {}: current status is {}",
                operation, ticket_id, current_status
            ),
            TicketError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for TicketError {}

/// Request to insert a new WAITING ticket.
#[derive(Debug, Clone)]
pub struct CreateTicketRequest {
    /// Day the queue number is allocated in.
    pub queue_date: NaiveDate,
    /// Number handed out when the day's sequence is empty.
    pub start_number: i64,
    pub priority: TicketPriority,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub notes: Option<String>,
    pub estimated_wait_time: Option<i64>,
}

/// Result ordering for ticket listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketOrder {
    /// Ascending queue number.
    #[default]
    QueueNumber,
    /// Dispatch order: priority descending, then oldest first.
    Dispatch,
    /// Most recently called first.
    RecentlyCalled,
}

/// Filter for querying tickets.
#[derive(Debug, Clone)]
pub struct TicketFilter {
    /// Only tickets of this queue day.
    pub queue_date: Option<NaiveDate>,
    pub status: Option<TicketStatus>,
    pub counter_id: Option<i64>,
    /// Only tickets with at least this priority.
    pub min_priority: Option<TicketPriority>,
    /// Exclude tickets expired by a daily reset.
    pub live_only: bool,
    pub order: TicketOrder,
    /// Maximum number of results; `None` returns every match.
    pub limit: Option<i64>,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for TicketFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            queue_date: None,
            status: None,
            counter_id: None,
            min_priority: None,
            live_only: false,
            order: TicketOrder::default(),
            limit: None,
            offset: 0,
        }
    }

    /// Live tickets of the given day.
    pub fn live_on(day: NaiveDate) -> Self {
        Self::new().with_queue_date(day).live()
    }

    pub fn with_queue_date(mut self, day: NaiveDate) -> Self {
        self.queue_date = Some(day);
        self
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_counter(mut self, counter_id: i64) -> Self {
        self.counter_id = Some(counter_id);
        self
    }

    pub fn with_min_priority(mut self, priority: TicketPriority) -> Self {
        self.min_priority = Some(priority);
        self
    }

    pub fn live(mut self) -> Self {
        self.live_only = true;
        self
    }

    pub fn ordered_by(mut self, order: TicketOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for ticket storage backends.
///
/// Status transitions are guarded at the storage level: a transition only
/// applies when the ticket is still in the expected status, so concurrent
/// callers cannot both win the same ticket.
pub trait TicketStore: Send + Sync {
    /// Allocate the next queue number of the day and insert a WAITING ticket.
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: i64) -> Result<Option<Ticket>, TicketError>;

    /// List tickets matching the filter.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter (limit/offset ignored).
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// Live ticket with this number on the given day.
    fn find_by_number(&self, day: NaiveDate, number: i64) -> Result<Option<Ticket>, TicketError>;

    /// Best live WAITING candidate of the day in dispatch order.
    fn next_waiting(&self, day: NaiveDate) -> Result<Option<Ticket>, TicketError>;

    /// Move a WAITING ticket to BEING_SERVED for `counter_id`.
    /// Returns `None` when the ticket is no longer WAITING.
    fn claim(
        &self,
        id: i64,
        counter_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, TicketError>;

    /// Put a BEING_SERVED ticket back to WAITING (undo of a claim).
    fn release(&self, id: i64) -> Result<bool, TicketError>;

    /// Move a BEING_SERVED ticket to COMPLETED or SKIPPED.
    fn finish(
        &self,
        id: i64,
        status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError>;

    /// Permanently delete COMPLETED/SKIPPED tickets last updated before `cutoff`.
    fn delete_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize, TicketError>;

    /// Soft-expire every live ticket and forget allocated numbers, atomically,
    /// so the next ticket starts over. Returns how many tickets were expired.
    fn start_new_day(&self, at: DateTime<Utc>) -> Result<usize, TicketError>;
}
