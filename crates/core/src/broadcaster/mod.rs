//! Real-time status broadcast to connected clients.

mod config;
mod runner;
mod types;

pub use config::BroadcasterConfig;
pub use runner::StatusBroadcaster;
pub use types::{CounterDisplay, Feed, QueueSnapshot, StreamMessage};
