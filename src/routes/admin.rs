use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// User management, nested under `/users`. Every handler authenticates via
/// the `AuthUser` extractor and then requires the `admin` role through the
/// guard, so a non-admin actor receives 403 regardless of which operation is
/// attempted.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /users (pipeline listing) and POST /users.
        .route("/", get(handlers::get_users).post(handlers::create_user))
        // GET/PUT/DELETE /users/{id}.
        .route(
            "/{id}",
            get(handlers::get_user_by_id)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
