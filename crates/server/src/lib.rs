//! HTTP surface of queuedesk: REST endpoints, SSE feeds, auth and metrics.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
