//! Identity provider seam.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::context::SecurityContext;
use crate::credential::Credential;
use crate::error::AuthError;

/// Verifies extracted credentials and produces a [`SecurityContext`].
///
/// Authentication mechanisms extract a [`Credential`] envelope from the
/// request and delegate here; the resolver owns verification (password
/// checking, certificate validation, session lookup) and is provided by an
/// external identity module:
///
/// ```ignore
/// let resolver: Arc<dyn IdentityResolver> = hub.get::<dyn IdentityResolver>()?;
/// let ctx = resolver.resolve(credential).await?;
/// ```
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Verify a credential and return the identity it proves.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the credential is invalid, expired, or malformed
    /// - `ServiceUnavailable` if the identity provider is not ready
    /// - `Internal` for unexpected errors
    async fn resolve(&self, credential: Credential) -> Result<SecurityContext, AuthError>;

    /// Mint an opaque session credential for a subject that just
    /// authenticated through the login form. Later requests present it back
    /// as [`Credential::Session`]. Only resolvers backing form authentication
    /// need to override this.
    ///
    /// # Errors
    ///
    /// Returns `Internal` unless overridden.
    async fn issue_session(&self, ctx: &SecurityContext) -> Result<SecretString, AuthError> {
        let _ = ctx;
        Err(AuthError::Internal(
            "identity resolver does not issue sessions".to_owned(),
        ))
    }
}
