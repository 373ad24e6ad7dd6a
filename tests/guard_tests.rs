use axum::http::StatusCode;
use bootcamp_api::{
    auth::{AuthUser, Role},
    guard::{require_owner_or_admin, require_role},
};
use uuid::Uuid;

fn actor(id: u128, role: Role) -> AuthUser {
    AuthUser {
        id: Uuid::from_u128(id),
        role,
    }
}

#[test]
fn test_require_role_passes_for_listed_roles() {
    assert!(require_role(&actor(1, Role::Publisher), &[Role::Publisher, Role::Admin]).is_ok());
    assert!(require_role(&actor(2, Role::Admin), &[Role::Publisher, Role::Admin]).is_ok());
}

#[test]
fn test_require_role_rejects_with_role_in_message() {
    let err = require_role(&actor(1, Role::User), &[Role::Publisher, Role::Admin]).unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        err.message(),
        "User role 'user' is not authorized to access this route"
    );
}

#[test]
fn test_require_owner_or_admin_passes_for_owner() {
    let owner = actor(7, Role::User);
    assert!(require_owner_or_admin(&owner, owner.id, "review").is_ok());
}

#[test]
fn test_require_owner_or_admin_passes_for_admin_non_owner() {
    let admin = actor(8, Role::Admin);
    assert!(require_owner_or_admin(&admin, Uuid::from_u128(7), "review").is_ok());
}

#[test]
fn test_require_owner_or_admin_rejects_other_user() {
    let intruder = actor(9, Role::User);
    let err = require_owner_or_admin(&intruder, Uuid::from_u128(7), "bootcamp").unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        err.message(),
        format!(
            "User {} is not authorized to modify this bootcamp",
            intruder.id
        )
    );
}

#[test]
fn test_publisher_role_does_not_bypass_ownership() {
    let publisher = actor(10, Role::Publisher);
    assert!(require_owner_or_admin(&publisher, Uuid::from_u128(7), "bootcamp").is_err());
}
