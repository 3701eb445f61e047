use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated endpoints used by monitoring and load balancers.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Returns "ok" as soon as the process is serving requests.
        .route("/health", get(|| async { "ok" }))
}
