//! API routes

pub mod health;
pub mod tickets;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::require_auth, state::AppState, websocket::ws_handler};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Backfill routes: served from the same ticket store the real-time
    // channel persists through, so reconnecting clients see one history.
    let ticket_routes = Router::new()
        .route("/tickets", post(tickets::create_ticket).get(tickets::list_tickets))
        .route("/tickets/:ticket_id", get(tickets::get_ticket))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(ws_handler))
        .nest("/api/v1", ticket_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
