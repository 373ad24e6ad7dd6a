use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    repository::RepositoryState,
};

/// Role
///
/// The closed set of roles recognised by the authorization guard. Stored as
/// lowercase text in the `users` table and carried on every authenticated
/// request via [`AuthUser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    /// The lowercase form used in the database and in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Used by the FromRow derive on User (`#[sqlx(try_from = "String")]`).
impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Claims
///
/// The payload expected inside a JSON Web Token issued by the external auth
/// provider. These claims are signed with the shared secret and validated on
/// every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the UUID of the user, keyed against the local `users` table.
    pub sub: Uuid,
    /// Expiration timestamp. Always validated.
    pub exp: usize,
    /// Issued-at timestamp.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the actor whose id and
/// role drive every role and ownership check. Produced by the extractor
/// implementation below; read-only to the rest of the application.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

fn reject() -> ApiError {
    ApiError::unauthorized("Not authorized to access this route")
}

/// AuthUser Extractor Implementation
///
/// Implements axum's `FromRequestParts`, making `AuthUser` usable as a plain
/// handler argument. Authentication is thereby separated from the handlers:
/// if credential resolution fails, the request is rejected with the uniform
/// 401 envelope before any handler or guard code runs.
///
/// Resolution order:
/// 1. Local-environment bypass via the `x-user-id` header (guarded by the
///    `Env` check, and still verified against the database).
/// 2. Bearer token extraction and JWT validation (expiry always enforced).
/// 3. Database lookup of the user's current record, so a deleted user cannot
///    keep using an otherwise valid token. The role is always taken from the
///    database, never from the token.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local development bypass. Only honoured outside production, and the
        // supplied id must still resolve to a real user row.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Ok(Some(user)) = repo.get_user(user_id).await {
                            return Ok(AuthUser {
                                id: user.id,
                                role: user.role,
                            });
                        }
                    }
                }
            }
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(reject)?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(reject)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        // Expired, malformed, and badly signed tokens are all rejected the
        // same way; the distinction is not surfaced to the client.
        let token_data =
            decode::<Claims>(token, &decoding_key, &validation).map_err(|_| reject())?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .map_err(|_| reject())?
            .ok_or_else(reject)?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}
