//! Domain primitives, ports, and the profile service.
//!
//! Purpose: Define strongly typed entities for users, roles, and auth state,
//! the ports the backend adapters implement, and the service that shapes
//! requests around them. Keep types immutable and document invariants and
//! wire field names in each type's Rustdoc.
//!
//! Public surface:
//! - Error / ErrorCode: failure payload returned by every operation.
//! - UserId, Email, Role, UserRecord, ProfileDocument: profile data model.
//! - AuthState / AuthIdentity: auth transitions delivered to observers.
//! - OperationOutcome: serialisable success/failure envelope.
//! - ProfileService / AuthObserver: the operations themselves.

pub mod auth_state;
pub mod error;
pub mod outcome;
pub mod ports;
pub mod profile_service;
pub mod user;

pub use self::auth_state::{AuthIdentity, AuthState};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::outcome::OperationOutcome;
pub use self::profile_service::{AuthObserver, ProfileService};
pub use self::user::{
    CREATED_AT_FIELD, Collection, EMAIL_FIELD, Email, ProfileData, ProfileDocument, ROLE_FIELD,
    Role, RoleValidationError, UID_FIELD, UserId, UserRecord, UserValidationError,
};

/// Convenient result alias for profile operations.
///
/// # Examples
/// ```
/// use carelink::domain::{Error, ProfileResult};
///
/// fn lookup() -> ProfileResult<()> {
///     Err(Error::not_found("User not found"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type ProfileResult<T> = Result<T, Error>;
