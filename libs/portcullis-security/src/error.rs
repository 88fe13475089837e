//! Error types shared by authentication mechanisms and identity resolvers.

use thiserror::Error;

/// Errors that can occur while establishing or checking an identity.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credential is invalid, expired, or malformed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The subject is authenticated but not allowed to proceed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The identity provider is not available.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
