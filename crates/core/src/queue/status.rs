//! Read-only projections of the live queue.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::counter::{Counter, CounterStore};
use crate::ticket::{Ticket, TicketFilter, TicketOrder, TicketStatus, TicketStore};

use super::{QueueClock, QueueError};

/// Counts and highlights of today's live queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub waiting: i64,
    pub being_served: i64,
    pub completed: i64,
    pub skipped: i64,
    pub total_today: i64,
    /// Tickets at counters right now, most recently called first.
    pub currently_serving: Vec<Ticket>,
    /// Upcoming tickets in dispatch order.
    pub next_waiting: Vec<Ticket>,
}

/// Per-counter view for displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub current_queue_number: Option<i64>,
    pub current_queue_id: Option<i64>,
    pub estimated_service_time: i64,
    pub max_queue: i64,
}

impl From<&Counter> for CounterSnapshot {
    fn from(counter: &Counter) -> Self {
        Self {
            id: counter.id,
            name: counter.name.clone(),
            is_active: counter.is_active,
            current_queue_number: counter.current_queue_number,
            current_queue_id: counter.current_queue_id,
            estimated_service_time: counter.estimated_service_time,
            max_queue: counter.max_queue,
        }
    }
}

/// Computes [`QueueStatus`] and counter snapshots on demand.
pub struct StatusAggregator {
    tickets: Arc<dyn TicketStore>,
    counters: Arc<dyn CounterStore>,
    clock: QueueClock,
    next_waiting_limit: i64,
}

impl StatusAggregator {
    pub fn new(
        next_waiting_limit: i64,
        clock: QueueClock,
        tickets: Arc<dyn TicketStore>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            tickets,
            counters,
            clock,
            next_waiting_limit,
        }
    }

    pub fn get_status(&self) -> Result<QueueStatus, QueueError> {
        let live = TicketFilter::live_on(self.clock.today());

        let count = |status: TicketStatus| self.tickets.count(&live.clone().with_status(status));
        let waiting = count(TicketStatus::Waiting)?;
        let being_served = count(TicketStatus::BeingServed)?;
        let completed = count(TicketStatus::Completed)?;
        let skipped = count(TicketStatus::Skipped)?;

        let currently_serving = self.tickets.list(
            &live
                .clone()
                .with_status(TicketStatus::BeingServed)
                .ordered_by(TicketOrder::RecentlyCalled),
        )?;

        let next_waiting = self.tickets.list(
            &live
                .with_status(TicketStatus::Waiting)
                .ordered_by(TicketOrder::Dispatch)
                .with_limit(self.next_waiting_limit),
        )?;

        Ok(QueueStatus {
            waiting,
            being_served,
            completed,
            skipped,
            total_today: waiting + being_served + completed + skipped,
            currently_serving,
            next_waiting,
        })
    }

    pub fn counter_snapshots(&self) -> Result<Vec<CounterSnapshot>, QueueError> {
        Ok(self
            .counters
            .list()?
            .iter()
            .map(CounterSnapshot::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CallNextPolicy;
    use crate::counter::{NewCounter, SqliteCounterStore};
    use crate::queue::QueueDispatcher;
    use crate::ticket::{CreateTicketRequest, SqliteTicketStore, TicketPriority};

    fn stores() -> (Arc<dyn TicketStore>, Arc<dyn CounterStore>) {
        (
            Arc::new(SqliteTicketStore::in_memory().unwrap()),
            Arc::new(SqliteCounterStore::in_memory().unwrap()),
        )
    }

    fn issue(tickets: &Arc<dyn TicketStore>, priority: TicketPriority) -> Ticket {
        tickets
            .create(CreateTicketRequest {
                queue_date: QueueClock::default().today(),
                start_number: 1,
                priority,
                customer_name: None,
                customer_contact: None,
                notes: None,
                estimated_wait_time: None,
            })
            .unwrap()
    }

    #[test]
    fn test_empty_status() {
        let (tickets, counters) = stores();
        let aggregator = StatusAggregator::new(5, QueueClock::default(), tickets, counters);

        let status = aggregator.get_status().unwrap();
        assert_eq!(status.total_today, 0);
        assert!(status.currently_serving.is_empty());
        assert!(status.next_waiting.is_empty());
        assert!(aggregator.counter_snapshots().unwrap().is_empty());
    }

    #[test]
    fn test_status_counts_and_lists() {
        let (tickets, counters) = stores();
        let counter = counters
            .create(NewCounter {
                name: "A".to_string(),
                description: None,
                is_active: true,
                estimated_service_time: 5,
                max_queue: 100,
            })
            .unwrap();
        let dispatcher = QueueDispatcher::new(
            CallNextPolicy::Complete,
            QueueClock::default(),
            Arc::clone(&tickets),
            Arc::clone(&counters),
        );

        let first = issue(&tickets, TicketPriority::Normal);
        issue(&tickets, TicketPriority::High);
        let low = issue(&tickets, TicketPriority::Low);
        issue(&tickets, TicketPriority::Normal);

        // Calls #2 (HIGH), then completes it while calling #1
        dispatcher.call_next(counter.id).unwrap();
        let serving = dispatcher.call_next(counter.id).unwrap().ticket;
        assert_eq!(serving.id, first.id);

        let aggregator = StatusAggregator::new(
            1,
            QueueClock::default(),
            Arc::clone(&tickets),
            Arc::clone(&counters),
        );
        let status = aggregator.get_status().unwrap();

        assert_eq!(status.waiting, 2);
        assert_eq!(status.being_served, 1);
        assert_eq!(status.completed, 1);
        assert_eq!(status.skipped, 0);
        assert_eq!(status.total_today, 4);
        assert_eq!(status.currently_serving[0].id, first.id);
        // Limited to one, NORMAL #4 goes before LOW #3
        assert_eq!(status.next_waiting.len(), 1);
        assert_eq!(status.next_waiting[0].queue_number, 4);
        assert_ne!(status.next_waiting[0].id, low.id);

        let snapshots = aggregator.counter_snapshots().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].current_queue_number, Some(1));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = QueueStatus {
            waiting: 1,
            being_served: 0,
            completed: 0,
            skipped: 0,
            total_today: 1,
            currently_serving: Vec::new(),
            next_waiting: Vec::new(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["beingServed"], 0);
        assert_eq!(json["totalToday"], 1);
        assert!(json["currentlyServing"].is_array());
        assert!(json["nextWaiting"].is_array());
    }
}
