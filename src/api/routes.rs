use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{health_check, receive, NlipAgent};

/// Well-known path every agent serves messages on
pub const NLIP_PATH: &str = "/nlip/";

/// Router exposing one agent over the message protocol
pub fn agent_router<A: NlipAgent>(agent: Arc<A>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Protocol endpoint
        .route(NLIP_PATH, post(receive::<A>))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Shared state
        .with_state(agent)
}
