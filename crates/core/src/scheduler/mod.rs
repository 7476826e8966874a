//! Background maintenance: periodic cleanup and the automatic daily reset.

mod config;
mod runner;

pub use config::MaintenanceConfig;
pub use runner::{MaintenanceScheduler, SchedulerPass};
