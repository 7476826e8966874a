//! Queue tickets: data types and storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTicketStore;
pub use store::{CreateTicketRequest, TicketError, TicketFilter, TicketOrder, TicketStore};
pub use types::{Ticket, TicketPriority, TicketStatus};
