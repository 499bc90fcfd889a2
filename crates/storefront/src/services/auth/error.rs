//! Authentication error types.

use thiserror::Error;

use crate::documents::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password left blank.
    #[error("email and password are required")]
    MissingCredentials,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] corewell_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Account storage failed.
    #[error("account store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Whether the caller can fix this by changing their input.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        !matches!(self, Self::PasswordHash | Self::Store(_))
    }
}
