use uuid::Uuid;

use crate::{
    auth::{AuthUser, Role},
    error::{ApiError, ApiResult},
};

/// Authorization Guard
///
/// The single reusable component enforcing the two authorization predicates
/// used across every resource: role membership and ownership-or-admin. Both
/// checks are pure: they read the actor and (for ownership) the already
/// fetched resource's owner, and either pass or raise an `ApiError`. They
/// never mutate anything.
///
/// Ordering contract for mutations: the caller fetches the resource, invokes
/// [`require_owner_or_admin`], and only then issues the write. Nothing else in
/// the same request touches the resource between fetch and write. No
/// cross-request isolation is provided here; two concurrent writers to the
/// same resource race at the persistence layer (see DESIGN.md).

/// require_role
///
/// Passes iff the actor's role is one of `allowed`. Used to gate whole route
/// groups (user management requires `admin`) and the create endpoints
/// (bootcamps: publisher/admin, reviews: user/admin).
///
/// Fails with 403 Forbidden.
pub fn require_role(actor: &AuthUser, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&actor.role) {
        return Ok(());
    }
    Err(ApiError::forbidden(format!(
        "User role '{}' is not authorized to access this route",
        actor.role
    )))
}

/// require_owner_or_admin
///
/// Passes iff the actor is the resource's owner or holds the `admin` role.
/// `resource_label` names the resource in the error message ("bootcamp",
/// "review").
///
/// Fails with 401 Unauthorized, leaving the resource untouched.
pub fn require_owner_or_admin(
    actor: &AuthUser,
    owner_id: Uuid,
    resource_label: &str,
) -> ApiResult<()> {
    if actor.id == owner_id || actor.role == Role::Admin {
        return Ok(());
    }
    Err(ApiError::unauthorized(format!(
        "User {} is not authorized to modify this {}",
        actor.id, resource_label
    )))
}
