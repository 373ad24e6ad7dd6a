use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// ErrorKind
///
/// The closed taxonomy of failure categories this API can produce. Every failure
/// raised anywhere in the application is constructed as exactly one of these
/// variants at its origin; nothing downstream inspects raw error shapes.
///
/// The kind is internal routing information only. Clients receive the mapped
/// HTTP status and message, never the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A persistence identifier with an invalid shape (e.g. a malformed UUID
    /// reaching a query). Mapped to 404 so probing with garbage ids is
    /// indistinguishable from a missing row.
    InvalidReference,
    /// A unique-constraint collision reported by the database.
    DuplicateValue,
    /// One or more field or query-parameter validators rejected the input.
    ValidationFailed,
    /// Authenticated but not permitted (ownership check failed).
    Unauthorized,
    /// Role not permitted for this route.
    Forbidden,
    /// Explicit absence of a resource, raised by a handler after a fetch.
    NotFound,
    /// Anything unclassified. Details are logged server-side only.
    Unknown,
}

/// ApiError
///
/// The single error shape flowing out of every handler, guard, and pipeline
/// stage. Implements `IntoResponse`, so handlers simply return
/// `Result<_, ApiError>` and axum renders the uniform error envelope:
///
/// ```json
/// { "success": false, "error": "<message>" }
/// ```
///
/// Request-scoped; never persisted or shared across requests.
#[derive(Debug, Clone)]
pub struct ApiError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
}

/// Convenience alias used across handlers and guards.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    /// Explicit absence of a resource (distinct from `InvalidReference`,
    /// which covers malformed identifiers).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, StatusCode::NOT_FOUND, message)
    }

    /// Ownership failure: the actor is authenticated but may not touch this
    /// resource.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, StatusCode::UNAUTHORIZED, message)
    }

    /// Role failure: the actor's role does not grant access to this route.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, StatusCode::FORBIDDEN, message)
    }

    /// validation
    ///
    /// Builds a `ValidationFailed` error from the individual validator
    /// messages. The response message is the concatenation of all of them, in
    /// the order the validators were declared, matching the behaviour of the
    /// schema layer this replaces.
    pub fn validation(messages: Vec<String>) -> Self {
        Self::new(
            ErrorKind::ValidationFailed,
            StatusCode::BAD_REQUEST,
            messages.join(", "),
        )
    }

    /// Single-message variant of [`ApiError::validation`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::validation(vec![message.into()])
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// Postgres SQLSTATE codes recognised by the normalizer.
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Normalizer
///
/// The single translation point from raw persistence failures to the uniform
/// `ApiError` shape. Handlers never match on `sqlx::Error` themselves; they
/// propagate with `?` and this conversion applies the mapping table:
///
/// | raw condition                      | kind             | status |
/// |------------------------------------|------------------|--------|
/// | invalid text representation (22P02)| InvalidReference | 404    |
/// | unique violation (23505)           | DuplicateValue   | 400    |
/// | row not found                      | NotFound         | 404    |
/// | anything else                      | Unknown          | 500    |
///
/// The raw error is logged in full before normalization; the client only ever
/// sees the fixed, safe message. This conversion is total and never panics.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = ?err, "persistence error");

        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => {
                    return Self::new(
                        ErrorKind::DuplicateValue,
                        StatusCode::BAD_REQUEST,
                        "Duplicate field value entered",
                    );
                }
                Some(PG_INVALID_TEXT_REPRESENTATION) => {
                    return Self::new(
                        ErrorKind::InvalidReference,
                        StatusCode::NOT_FOUND,
                        "Resource not found",
                    );
                }
                _ => {}
            }
        }

        if matches!(err, sqlx::Error::RowNotFound) {
            return Self::new(
                ErrorKind::NotFound,
                StatusCode::NOT_FOUND,
                "Resource not found",
            );
        }

        Self::new(
            ErrorKind::Unknown,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server Error",
        )
    }
}

/// ErrorBody
///
/// The wire shape of the error envelope. Stable across all endpoints.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
