//! HTTP API - host operations over JSON
//!
//! Read endpoints return the latest completed cycle's view. The only
//! mutations are alert acknowledgment, checklist generation and completion,
//! and forcing a manual cycle.

pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::monitor::SafetyMonitor;

pub type SharedState = SafetyMonitor;

/// Create the API router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // Risk state
        .route("/api/status", get(routes::api_status))
        .route("/api/risk", get(routes::api_risk))
        .route("/api/cycle", post(routes::api_trigger_cycle))
        .route("/api/cycles", get(routes::api_recent_cycles))
        // Alerts
        .route("/api/alerts", get(routes::api_alerts))
        .route("/api/alerts/:id/ack", post(routes::api_ack_alert))
        // Checklists
        .route("/api/checklists", post(routes::api_generate_checklist))
        .route("/api/checklists/:id", get(routes::api_checklist))
        .route(
            "/api/checklists/:id/items/:item/complete",
            post(routes::api_complete_item),
        )
        // Reference data
        .route("/api/contacts", get(routes::api_contacts))
        // Health check
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
