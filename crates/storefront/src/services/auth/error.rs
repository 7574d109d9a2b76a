//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username is empty, too long, or contains disallowed characters.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] tshop_core::UsernameError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show on a form.
    ///
    /// Login failures never reveal whether the username exists.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUsername(e) => format!("Enter a valid username: {e}."),
            Self::InvalidCredentials => {
                "Please enter a correct username and password.".to_string()
            }
            Self::UserAlreadyExists => "A user with that username already exists.".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::PasswordMismatch => "The two password fields didn't match.".to_string(),
            Self::Repository(_) | Self::PasswordHash => {
                "Something went wrong, please try again.".to_string()
            }
        }
    }
}
