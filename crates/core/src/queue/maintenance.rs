//! Cleanup of old finished tickets and the daily reset.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::counter::CounterStore;
use crate::metrics::{MAINTENANCE_RUNS, TICKETS_PURGED};
use crate::ticket::TicketStore;

use super::{QueueClock, QueueError, QueueGate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    /// Finished tickets permanently removed.
    pub removed: u64,
    /// Tickets last updated before this instant were eligible.
    pub cutoff: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    /// Queue day the reset ran on.
    pub day: NaiveDate,
    pub counters_cleared: u64,
    pub tickets_expired: u64,
}

pub struct Maintenance {
    tickets: Arc<dyn TicketStore>,
    counters: Arc<dyn CounterStore>,
    clock: QueueClock,
    retention: Duration,
    gate: QueueGate,
}

impl Maintenance {
    pub fn new(
        retention_hours: i64,
        clock: QueueClock,
        tickets: Arc<dyn TicketStore>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            tickets,
            counters,
            clock,
            retention: Duration::hours(retention_hours),
            gate: QueueGate::new(),
        }
    }

    pub fn with_gate(mut self, gate: QueueGate) -> Self {
        self.gate = gate;
        self
    }

    /// Hard-delete COMPLETED/SKIPPED tickets older than the retention window.
    pub fn cleanup(&self) -> Result<CleanupReport, QueueError> {
        let cutoff = self.clock.now() - self.retention;
        let removed = self.tickets.delete_finished_before(cutoff)? as u64;

        MAINTENANCE_RUNS.with_label_values(&["cleanup"]).inc();
        TICKETS_PURGED.inc_by(removed);
        info!(removed, cutoff = %cutoff, "Cleanup finished");

        Ok(CleanupReport { removed, cutoff })
    }

    /// Expire live tickets, restart numbering and clear counter pointers.
    ///
    /// Holds the gate exclusively, so no ticket is issued or called in between.
    /// Tickets go first: a counter left pointing at an expired ticket is worse
    /// than an idle counter whose ticket is still live.
    pub fn reset_daily(&self) -> Result<ResetReport, QueueError> {
        let _gate = self.gate.exclusive()?;
        let tickets_expired = self.tickets.start_new_day(self.clock.now())? as u64;
        let counters_cleared = self.counters.clear_all()? as u64;

        let day = self.clock.today();
        MAINTENANCE_RUNS.with_label_values(&["reset_daily"]).inc();
        info!(
            day = %day,
            counters_cleared,
            tickets_expired,
            "Daily reset finished"
        );

        Ok(ResetReport {
            day,
            counters_cleared,
            tickets_expired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::{NewCounter, SqliteCounterStore};
    use crate::ticket::{
        CreateTicketRequest, SqliteTicketStore, TicketFilter, TicketPriority, TicketStatus,
    };

    fn setup(retention_hours: i64) -> (Maintenance, Arc<dyn TicketStore>, Arc<dyn CounterStore>) {
        let tickets: Arc<dyn TicketStore> = Arc::new(SqliteTicketStore::in_memory().unwrap());
        let counters: Arc<dyn CounterStore> = Arc::new(SqliteCounterStore::in_memory().unwrap());
        let maintenance = Maintenance::new(
            retention_hours,
            QueueClock::default(),
            Arc::clone(&tickets),
            Arc::clone(&counters),
        );
        (maintenance, tickets, counters)
    }

    fn issue(tickets: &Arc<dyn TicketStore>) -> i64 {
        tickets
            .create(CreateTicketRequest {
                queue_date: QueueClock::default().today(),
                start_number: 1,
                priority: TicketPriority::Normal,
                customer_name: None,
                customer_contact: None,
                notes: None,
                estimated_wait_time: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_cleanup_respects_retention() {
        let (maintenance, tickets, _) = setup(24);
        let id = issue(&tickets);
        tickets.claim(id, 1, Utc::now()).unwrap();
        tickets.finish(id, TicketStatus::Completed, Utc::now()).unwrap();

        // Finished just now: kept
        let report = maintenance.cleanup().unwrap();
        assert_eq!(report.removed, 0);
        assert!(tickets.get(id).unwrap().is_some());
    }

    #[test]
    fn test_cleanup_with_zero_retention_removes_finished_only() {
        let (maintenance, tickets, _) = setup(0);
        let done = issue(&tickets);
        let waiting = issue(&tickets);
        tickets.claim(done, 1, Utc::now()).unwrap();
        tickets.finish(done, TicketStatus::Skipped, Utc::now()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let report = maintenance.cleanup().unwrap();
        assert_eq!(report.removed, 1);
        assert!(tickets.get(done).unwrap().is_none());
        assert!(tickets.get(waiting).unwrap().is_some());

        assert_eq!(maintenance.cleanup().unwrap().removed, 0);
    }

    #[test]
    fn test_reset_daily() {
        let (maintenance, tickets, counters) = setup(24);
        let counter = counters
            .create(NewCounter {
                name: "A".to_string(),
                description: None,
                is_active: true,
                estimated_service_time: 5,
                max_queue: 100,
            })
            .unwrap();
        let first = issue(&tickets);
        issue(&tickets);
        tickets.claim(first, counter.id, Utc::now()).unwrap();
        counters.assign(counter.id, first, 1).unwrap();

        let report = maintenance.reset_daily().unwrap();
        assert_eq!(report.counters_cleared, 1);
        assert_eq!(report.tickets_expired, 2);
        assert!(!counters.get(counter.id).unwrap().unwrap().is_serving());
        assert_eq!(
            tickets.count(&TicketFilter::live_on(report.day)).unwrap(),
            0
        );

        // Numbering starts over
        let next = tickets.get(issue(&tickets)).unwrap().unwrap();
        assert_eq!(next.queue_number, 1);

        // Second reset only expires the new ticket
        let again = maintenance.reset_daily().unwrap();
        assert_eq!(again.counters_cleared, 0);
        assert_eq!(again.tickets_expired, 1);
    }
}
