//! Authentication error types.

use thiserror::Error;

/// Credential-level failure.
///
/// The variants exist for logging; the HTTP boundary collapses every one of
/// them into the same generic "unauthorized" response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("cryptography error: {0}")]
    Crypto(String),
}
