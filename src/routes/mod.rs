/// Router Module Index
///
/// Organizes the routing table into security-segregated modules so access
/// control is applied explicitly at the module level rather than per handler
/// by convention.

/// Routes accessible to all clients (anonymous, read-only).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// User-management routes; every handler enforces the `admin` role through
/// the guard.
pub mod admin;
