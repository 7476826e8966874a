pub mod audit;
pub mod auth;
pub mod broadcaster;
pub mod config;
pub mod counter;
pub mod metrics;
pub mod queue;
pub mod scheduler;
mod storage;
pub mod ticket;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditEventEnvelope, AuditFilter, AuditHandle,
    AuditRecord, AuditStore, AuditWriter, SqliteAuditStore, SYSTEM_ACTOR,
};
pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
};
pub use broadcaster::{
    BroadcasterConfig, CounterDisplay, Feed, QueueSnapshot, StatusBroadcaster, StreamMessage,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, BusyCounterPolicy,
    CallNextPolicy, Config, ConfigError, QueueConfig, SanitizedConfig,
};
pub use counter::{
    Counter, CounterError, CounterStore, CreateCounterRequest, SqliteCounterStore,
    UpdateCounterRequest,
};
pub use queue::{
    CleanupReport, CounterSnapshot, Dispatch, GenerateTicket, QueueChange, QueueClock, QueueError,
    QueueService, QueueStatus, ResetReport, StatusAggregator,
};
pub use scheduler::{MaintenanceConfig, MaintenanceScheduler};
pub use ticket::{SqliteTicketStore, Ticket, TicketPriority, TicketStatus, TicketStore};
