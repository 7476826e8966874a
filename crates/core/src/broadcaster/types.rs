//! Messages pushed to status subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::queue::{CounterSnapshot, QueueStatus};
use crate::ticket::Ticket;

/// Full queue view: status counts plus every counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    #[serde(flatten)]
    pub status: QueueStatus,
    pub counters: Vec<CounterSnapshot>,
    pub generated_at: DateTime<Utc>,
}

/// Compact view for the waiting-room display board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterDisplay {
    pub counters: Vec<CounterSnapshot>,
    pub currently_serving: Vec<Ticket>,
    pub next_waiting: Vec<Ticket>,
    pub generated_at: DateTime<Utc>,
}

/// Which feed a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    QueueUpdates,
    CounterDisplay,
}

/// Message delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    QueueUpdate(QueueSnapshot),
    CounterDisplay(CounterDisplay),
    /// Keep-alive; carries no queue data.
    Heartbeat { timestamp: i64 },
}

impl StreamMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamMessage::QueueUpdate(_) => "queue_update",
            StreamMessage::CounterDisplay(_) => "counter_display",
            StreamMessage::Heartbeat { .. } => "heartbeat",
        }
    }

    /// Whether subscribers of `feed` should receive this message.
    pub fn belongs_to(&self, feed: Feed) -> bool {
        match self {
            StreamMessage::QueueUpdate(_) => feed == Feed::QueueUpdates,
            StreamMessage::CounterDisplay(_) => feed == Feed::CounterDisplay,
            StreamMessage::Heartbeat { .. } => true,
        }
    }
}
