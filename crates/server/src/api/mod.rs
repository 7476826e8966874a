pub mod audit;
pub mod counters;
pub mod cron;
pub mod handlers;
pub mod middleware;
pub mod queue;
pub mod response;
pub mod routes;
pub mod sse;

pub use response::{ApiError, ApiResponse, ApiResult};
pub use routes::create_router;
