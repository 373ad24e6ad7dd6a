use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// All mutation endpoints for standard users and publishers. The `AuthUser`
/// extractor middleware on the layer above guarantees every handler receives
/// a resolved actor; the guard then applies the role or ownership predicate
/// before any write.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The authenticated user's own record.
        .route("/me", get(handlers::get_me))
        // POST /bootcamps
        // Publisher/admin only; non-admin publishers are limited to one
        // bootcamp.
        .route("/bootcamps", post(handlers::create_bootcamp))
        // PUT/DELETE /bootcamps/{id}
        // Owner-or-admin; fetch, guard, then write.
        .route(
            "/bootcamps/{id}",
            put(handlers::update_bootcamp).delete(handlers::delete_bootcamp),
        )
        // POST /bootcamps/{id}/reviews
        // User/admin; the parent bootcamp must exist.
        .route("/bootcamps/{id}/reviews", post(handlers::add_review))
        // PUT/DELETE /reviews/{id}
        // Owner-or-admin; fetch, guard, then write.
        .route(
            "/reviews/{id}",
            put(handlers::update_review).delete(handlers::delete_review),
        )
}
