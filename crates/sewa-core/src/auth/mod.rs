//! Authentication, sessions and the permission gate.

mod accounts;
mod session;

pub use accounts::*;
pub use session::*;

use thiserror::Error;

use crate::models::Capability;

/// Authentication and authorization errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("Username or password incorrect")]
    InvalidCredentials,

    #[error("Access denied: missing '{}' capability", .0.as_str())]
    AccessDenied(Capability),

    #[error("Select a specific organization first")]
    AmbiguousOrganization,

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Session restore failed: {0}")]
    Session(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;
