use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{audit, counters, cron, handlers, queue, sse};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Customer-facing: ticket kiosk, lookup, displays
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        // Counters (read)
        .route("/counter", get(counters::list_counters))
        .route("/counter/", get(counters::list_counters))
        .route("/counter/{id}", get(counters::get_counter))
        // Queue (read + issue)
        .route("/queue", get(queue::list_queue))
        .route("/queue/", get(queue::list_queue))
        .route("/queue/status", get(queue::get_status))
        .route("/queue/find", get(queue::find_by_number))
        .route("/queue/generate-ticket", post(queue::generate_ticket))
        .route("/queue/{id}", get(queue::get_queue))
        // Live feeds
        .route("/sse/queue-updates", get(sse::queue_updates))
        .route("/sse/counter-display", get(sse::counter_display));

    // Operator and admin actions
    let protected_routes = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        .route("/audit", get(audit::query_audit))
        // Counters (admin)
        .route("/counter", post(counters::create_counter))
        .route("/counter/", post(counters::create_counter))
        .route(
            "/counter/{id}",
            axum::routing::put(counters::update_counter).delete(counters::delete_counter),
        )
        .route("/counter/{id}/toggle-status", patch(counters::toggle_status))
        // Dispatch
        .route("/queue/call-next", post(queue::call_next))
        .route("/queue/{id}/complete", patch(queue::complete))
        .route("/queue/{id}/skip", patch(queue::skip))
        // Maintenance
        .route("/cron/cleanup", post(cron::cleanup))
        .route("/cron/reset-daily", post(cron::reset_daily))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes).with_state(state);

    // Displays are usually served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
