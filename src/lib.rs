use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, ApiResult, ErrorKind};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) from every handler
/// decorated with `#[utoipa::path]` and every schema model. Served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_bootcamps, handlers::get_bootcamp, handlers::create_bootcamp,
        handlers::update_bootcamp, handlers::delete_bootcamp,
        handlers::get_reviews, handlers::get_bootcamp_reviews, handlers::get_review,
        handlers::add_review, handlers::update_review, handlers::delete_review,
        handlers::get_users, handlers::get_user_by_id, handlers::create_user,
        handlers::update_user, handlers::delete_user, handlers::get_me,
    ),
    components(
        schemas(
            models::Bootcamp, models::BootcampSummary, models::Review, models::User,
            models::CreateBootcampRequest, models::UpdateBootcampRequest,
            models::CreateReviewRequest, models::UpdateReviewRequest,
            models::CreateUserRequest, models::UpdateUserRequest,
            query::ListEnvelope, query::PageLinks,
            auth::Role,
        )
    ),
    tags(
        (name = "bootcamp-api", description = "Bootcamp Directory API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding all application services and
/// configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: abstracts database access behind the trait object.
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// FromRef implementations let extractors pull individual components out of
// the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the authenticated route group. `AuthUser`
/// implements `FromRequestParts`, so if credential resolution fails the
/// request is rejected with the uniform 401 envelope before the handler
/// runs. On success the request proceeds unchanged.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated routes: protected by the auth middleware.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // User management: nested under '/users'. The admin role check is
        // performed inside the handlers through the guard.
        .nest("/users", admin::admin_routes())
        .with_state(state);

    // Observability and correlation layers (applied outermost).
    base_router
        .layer(
            ServiceBuilder::new()
                // Unique UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request/response lifecycle tracing, correlated by request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Return the generated x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the tracing span for each request: the `x-request-id` header
/// (if present) is included alongside the HTTP method and URI so all log
/// lines for one request correlate.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
