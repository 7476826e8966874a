//! Queue services: issuing, dispatching, counter administration, status and
//! maintenance.

mod clock;
mod dispatcher;
mod error;
mod gate;
mod issuer;
mod maintenance;
mod registry;
mod service;
mod status;

pub use clock::QueueClock;
pub use dispatcher::{Dispatch, QueueDispatcher};
pub use error::QueueError;
pub use gate::QueueGate;
pub use issuer::{GenerateTicket, TicketIssuer};
pub use maintenance::{CleanupReport, Maintenance, ResetReport};
pub use registry::{CounterRegistry, RegistryOutcome};
pub use service::{QueueChange, QueueService, UpdateCallback};
pub use status::{CounterSnapshot, QueueStatus, StatusAggregator};
