//! Core ticket data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a queue ticket.
///
/// ```text
/// WAITING ──call-next──▶ BEING_SERVED ──complete──▶ COMPLETED
///                                     └──skip─────▶ SKIPPED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Waiting,
    BeingServed,
    Completed,
    Skipped,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Waiting,
        TicketStatus::BeingServed,
        TicketStatus::Completed,
        TicketStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Waiting => "WAITING",
            TicketStatus::BeingServed => "BEING_SERVED",
            TicketStatus::Completed => "COMPLETED",
            TicketStatus::Skipped => "SKIPPED",
        }
    }

    /// Terminal statuses; the ticket keeps its counter for history.
    pub fn is_finished(&self) -> bool {
        matches!(self, TicketStatus::Completed | TicketStatus::Skipped)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(TicketStatus::Waiting),
            "BEING_SERVED" => Ok(TicketStatus::BeingServed),
            "COMPLETED" => Ok(TicketStatus::Completed),
            "SKIPPED" => Ok(TicketStatus::Skipped),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

/// Dispatch priority. Higher priorities are called first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl TicketPriority {
    /// Numeric rank used for storage and ordering.
    pub fn rank(&self) -> i64 {
        match self {
            TicketPriority::Low => 0,
            TicketPriority::Normal => 1,
            TicketPriority::High => 2,
        }
    }

    pub fn from_rank(rank: i64) -> Self {
        match rank {
            i64::MIN..=0 => TicketPriority::Low,
            1 => TicketPriority::Normal,
            _ => TicketPriority::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "LOW",
            TicketPriority::Normal => "NORMAL",
            TicketPriority::High => "HIGH",
        }
    }
}

/// A customer's position in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    /// Sequential number, unique among the live tickets of `queue_date`.
    pub queue_number: i64,
    /// Local calendar day the number belongs to.
    pub queue_date: NaiveDate,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    /// Counter that called the ticket. Set once, kept after completion/skip.
    pub counter_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub notes: Option<String>,
    /// Estimated wait at issue time, in minutes.
    pub estimated_wait_time: Option<i64>,
    /// Seconds between call and completion/skip.
    pub actual_service_time: Option<i64>,
    pub called_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set by the daily reset; expired tickets drop out of the live queue.
    pub expired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_live(&self) -> bool {
        self.expired_at.is_none()
    }
}
