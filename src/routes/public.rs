use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated, read-only access to the directory. All listing endpoints
/// run through the generic query pipeline; no mutation lives here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // GET /bootcamps?averagecost[gt]=...&sort=-name&select=...&page=...&limit=...
        .route("/bootcamps", get(handlers::get_bootcamps))
        // GET /bootcamps/{id}
        .route("/bootcamps/{id}", get(handlers::get_bootcamp))
        // GET /bootcamps/{id}/reviews
        // Same pipeline as /reviews with the bootcamp pinned by a base filter.
        .route("/bootcamps/{id}/reviews", get(handlers::get_bootcamp_reviews))
        // GET /reviews?populate=bootcamp&...
        .route("/reviews", get(handlers::get_reviews))
        // GET /reviews/{id}
        .route("/reviews/{id}", get(handlers::get_review))
}
