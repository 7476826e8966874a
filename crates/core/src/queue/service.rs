//! Queue service: the single entry point for queue and counter operations.
//!
//! Wraps the issuer, dispatcher, registry, status aggregator and maintenance,
//! and after every mutation emits an audit event and notifies the update
//! callback (used to push fresh snapshots to subscribers).

use std::sync::Arc;

use chrono::NaiveDate;

use crate::audit::{AuditEvent, AuditHandle};
use crate::config::QueueConfig;
use crate::counter::{Counter, CounterStore, CreateCounterRequest, UpdateCounterRequest};
use crate::scheduler::MaintenanceConfig;
use crate::storage::format_date;
use crate::ticket::{Ticket, TicketStatus, TicketStore};

use super::{
    CleanupReport, CounterRegistry, CounterSnapshot, Dispatch, GenerateTicket, Maintenance,
    QueueClock, QueueDispatcher, QueueError, QueueGate, QueueStatus, ResetReport,
    StatusAggregator, TicketIssuer,
};

/// What changed, passed to the update callback.
#[derive(Debug, Clone)]
pub enum QueueChange {
    TicketIssued(Ticket),
    TicketCalled(Ticket),
    TicketFinished(Ticket),
    CounterChanged(i64),
    Maintenance,
}

impl QueueChange {
    pub fn kind(&self) -> &'static str {
        match self {
            QueueChange::TicketIssued(_) => "ticket_issued",
            QueueChange::TicketCalled(_) => "ticket_called",
            QueueChange::TicketFinished(_) => "ticket_finished",
            QueueChange::CounterChanged(_) => "counter_changed",
            QueueChange::Maintenance => "maintenance",
        }
    }
}

/// Callback invoked after each mutation.
pub type UpdateCallback = Arc<dyn Fn(QueueChange) + Send + Sync>;

pub struct QueueService {
    clock: QueueClock,
    issuer: TicketIssuer,
    dispatcher: Arc<QueueDispatcher>,
    registry: CounterRegistry,
    status: Arc<StatusAggregator>,
    maintenance: Maintenance,
    audit: Option<AuditHandle>,
    on_update: Option<UpdateCallback>,
}

impl QueueService {
    pub fn new(
        queue: &QueueConfig,
        maintenance: &MaintenanceConfig,
        tickets: Arc<dyn TicketStore>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        let clock = QueueClock::new(queue.utc_offset_minutes);
        let gate = QueueGate::new();

        let dispatcher = Arc::new(
            QueueDispatcher::new(
                queue.call_next_policy,
                clock,
                Arc::clone(&tickets),
                Arc::clone(&counters),
            )
            .with_gate(gate.clone()),
        );

        Self {
            clock,
            issuer: TicketIssuer::new(queue, clock, Arc::clone(&tickets), Arc::clone(&counters))
                .with_gate(gate.clone()),
            registry: CounterRegistry::new(queue, Arc::clone(&counters), Arc::clone(&dispatcher)),
            dispatcher,
            status: Arc::new(StatusAggregator::new(
                queue.next_waiting_limit,
                clock,
                Arc::clone(&tickets),
                Arc::clone(&counters),
            )),
            maintenance: Maintenance::new(maintenance.retention_hours, clock, tickets, counters)
                .with_gate(gate),
            audit: None,
            on_update: None,
        }
    }

    /// Set the audit handle for emitting events.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Set a callback run after each successful mutation.
    pub fn with_update_callback(mut self, callback: UpdateCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    /// Shared aggregator, for the broadcaster.
    pub fn status_aggregator(&self) -> Arc<StatusAggregator> {
        Arc::clone(&self.status)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    fn notify(&self, change: QueueChange) {
        if let Some(ref callback) = self.on_update {
            callback(change);
        }
    }

    fn finished_event(ticket: &Ticket, user_id: &str) -> AuditEvent {
        let user_id = user_id.to_string();
        match ticket.status {
            TicketStatus::Skipped => AuditEvent::TicketSkipped {
                ticket_id: ticket.id,
                queue_number: ticket.queue_number,
                counter_id: ticket.counter_id,
                user_id,
                service_seconds: ticket.actual_service_time,
            },
            _ => AuditEvent::TicketCompleted {
                ticket_id: ticket.id,
                queue_number: ticket.queue_number,
                counter_id: ticket.counter_id,
                user_id,
                service_seconds: ticket.actual_service_time,
            },
        }
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    pub fn generate_ticket(&self, request: GenerateTicket) -> Result<Ticket, QueueError> {
        let ticket = self.issuer.generate(request)?;

        self.emit(AuditEvent::TicketIssued {
            ticket_id: ticket.id,
            queue_number: ticket.queue_number,
            queue_date: format_date(&ticket.queue_date),
            priority: ticket.priority,
            estimated_wait_time: ticket.estimated_wait_time,
        });
        self.notify(QueueChange::TicketIssued(ticket.clone()));

        Ok(ticket)
    }

    pub fn call_next(&self, counter_id: i64, user_id: &str) -> Result<Dispatch, QueueError> {
        let dispatch = self.dispatcher.call_next(counter_id)?;

        if let Some(ref finished) = dispatch.finished {
            self.emit(Self::finished_event(finished, user_id));
        }
        self.emit(AuditEvent::TicketCalled {
            ticket_id: dispatch.ticket.id,
            queue_number: dispatch.ticket.queue_number,
            counter_id,
            user_id: user_id.to_string(),
        });
        self.notify(QueueChange::TicketCalled(dispatch.ticket.clone()));

        Ok(dispatch)
    }

    pub fn complete(&self, ticket_id: i64, user_id: &str) -> Result<Ticket, QueueError> {
        let ticket = self.dispatcher.complete(ticket_id)?;
        self.emit(Self::finished_event(&ticket, user_id));
        self.notify(QueueChange::TicketFinished(ticket.clone()));
        Ok(ticket)
    }

    pub fn skip(&self, ticket_id: i64, user_id: &str) -> Result<Ticket, QueueError> {
        let ticket = self.dispatcher.skip(ticket_id)?;
        self.emit(Self::finished_event(&ticket, user_id));
        self.notify(QueueChange::TicketFinished(ticket.clone()));
        Ok(ticket)
    }

    pub fn get_ticket(&self, ticket_id: i64) -> Result<Ticket, QueueError> {
        self.dispatcher.get(ticket_id)
    }

    pub fn find_by_number(&self, number: i64) -> Result<Ticket, QueueError> {
        self.dispatcher.find_by_number(number)
    }

    pub fn list_today(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>, QueueError> {
        self.dispatcher.list_today(status)
    }

    pub fn status(&self) -> Result<QueueStatus, QueueError> {
        self.status.get_status()
    }

    pub fn counter_snapshots(&self) -> Result<Vec<CounterSnapshot>, QueueError> {
        self.status.counter_snapshots()
    }

    // =========================================================================
    // Counters
    // =========================================================================

    pub fn create_counter(
        &self,
        request: CreateCounterRequest,
        user_id: &str,
    ) -> Result<Counter, QueueError> {
        let counter = self.registry.create(request)?;
        self.emit(AuditEvent::CounterCreated {
            counter_id: counter.id,
            name: counter.name.clone(),
            user_id: user_id.to_string(),
        });
        self.notify(QueueChange::CounterChanged(counter.id));
        Ok(counter)
    }

    pub fn update_counter(
        &self,
        id: i64,
        request: UpdateCounterRequest,
        user_id: &str,
    ) -> Result<Counter, QueueError> {
        let changed_fields = changed_fields(&request);
        let outcome = self.registry.update(id, request)?;

        if let Some(ref released) = outcome.released {
            self.emit(Self::finished_event(released, user_id));
        }
        self.emit(AuditEvent::CounterUpdated {
            counter_id: id,
            user_id: user_id.to_string(),
            changed_fields,
        });
        self.notify(QueueChange::CounterChanged(id));
        Ok(outcome.counter)
    }

    pub fn delete_counter(&self, id: i64, user_id: &str) -> Result<Counter, QueueError> {
        let outcome = self.registry.delete(id)?;

        if let Some(ref released) = outcome.released {
            self.emit(Self::finished_event(released, user_id));
        }
        self.emit(AuditEvent::CounterDeleted {
            counter_id: id,
            user_id: user_id.to_string(),
            released_ticket_id: outcome.released.as_ref().map(|t| t.id),
        });
        self.notify(QueueChange::CounterChanged(id));
        Ok(outcome.counter)
    }

    pub fn toggle_counter(&self, id: i64, user_id: &str) -> Result<Counter, QueueError> {
        let outcome = self.registry.toggle(id)?;

        if let Some(ref released) = outcome.released {
            self.emit(Self::finished_event(released, user_id));
        }
        self.emit(AuditEvent::CounterToggled {
            counter_id: id,
            user_id: user_id.to_string(),
            is_active: outcome.counter.is_active,
            released_ticket_id: outcome.released.as_ref().map(|t| t.id),
        });
        self.notify(QueueChange::CounterChanged(id));
        Ok(outcome.counter)
    }

    pub fn get_counter(&self, id: i64) -> Result<Counter, QueueError> {
        self.registry.get(id)
    }

    pub fn list_counters(&self) -> Result<Vec<Counter>, QueueError> {
        self.registry.list()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    pub fn cleanup(&self, user_id: &str) -> Result<CleanupReport, QueueError> {
        let report = self.maintenance.cleanup()?;
        self.emit(AuditEvent::CleanupRan {
            user_id: user_id.to_string(),
            removed: report.removed,
            cutoff: report.cutoff,
        });
        if report.removed > 0 {
            self.notify(QueueChange::Maintenance);
        }
        Ok(report)
    }

    pub fn reset_daily(&self, user_id: &str) -> Result<ResetReport, QueueError> {
        let report = self.maintenance.reset_daily()?;
        self.emit(AuditEvent::DailyReset {
            user_id: user_id.to_string(),
            day: format_date(&report.day),
            counters_cleared: report.counters_cleared,
            tickets_expired: report.tickets_expired,
        });
        self.notify(QueueChange::Maintenance);
        Ok(report)
    }
}

fn changed_fields(request: &UpdateCounterRequest) -> Vec<String> {
    [
        ("name", request.name.is_some()),
        ("description", request.description.is_some()),
        ("isActive", request.is_active.is_some()),
        ("estimatedServiceTime", request.estimated_service_time.is_some()),
        ("maxQueue", request.max_queue.is_some()),
    ]
    .into_iter()
    .filter(|(_, present)| *present)
    .map(|(name, _)| name.to_string())
    .collect()
}
