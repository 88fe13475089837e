//! Authentication mechanism seam and the basic/mTLS built-ins.
//!
//! Mechanisms extract a credential envelope from the request and delegate
//! verification to the [`IdentityResolver`]. Which mechanisms get installed,
//! and whether basic authentication is the explicit choice or merely the
//! fallback, is decided here from the build-time configuration.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::HeaderMap;
use secrecy::SecretString;

use portcullis_security::{AuthError, Credential, IdentityResolver, SecurityContext};

use crate::config::HttpAuthConfig;

/// How the basic authentication mechanism participates in this assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicInstallation {
    /// Not installed at all.
    Skipped,
    /// Installed as the fallback mechanism, superseded by any explicitly
    /// registered mechanism.
    Fallback,
    /// Installed because the user opted in.
    Explicit,
}

/// Informational record: an authentication scheme advertised for
/// documentation and introspection. Behavior-neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisedScheme {
    Basic,
}

/// Whether a basic authentication mechanism must be installed for the
/// application at all.
///
/// Short-circuit order matters: an explicit opt-out always wins; with basic
/// unset, any other configured mechanism (form, mTLS, management basic)
/// takes precedence over the unset default.
#[must_use]
pub fn basic_auth_required(config: &HttpAuthConfig) -> bool {
    // basic auth explicitly disabled
    if config.basic == Some(false) {
        return false;
    }
    if !config.basic.unwrap_or(false)
        && (config.form.enabled || config.mtls_enabled() || config.management_basic_enabled())
    {
        // another mechanism is configured, the unset default stays out
        return false;
    }
    true
}

/// Resolve the installation decision for the basic mechanism.
///
/// Exactly one decision per assembly: `Fallback` only when none of
/// form/mTLS/explicit-basic is set, so that some mechanism always exists.
#[must_use]
pub fn basic_installation(config: &HttpAuthConfig) -> BasicInstallation {
    if !basic_auth_required(config) {
        return BasicInstallation::Skipped;
    }
    if config.form.enabled || config.mtls_enabled() || config.basic.unwrap_or(false) {
        BasicInstallation::Explicit
    } else {
        BasicInstallation::Fallback
    }
}

/// An installable HTTP authentication mechanism.
///
/// The authentication filter discovers mechanisms through the component
/// registry, not by static reference; implementations must therefore stay
/// registered even when nothing names them directly.
#[async_trait]
pub trait AuthMechanism: Send + Sync {
    /// Scheme identifier ("basic", "form", "x509").
    fn scheme(&self) -> &'static str;

    /// Mechanisms with a higher priority attempt extraction first.
    fn priority(&self) -> i16 {
        0
    }

    /// `WWW-Authenticate` challenge for this scheme, when it has one.
    fn challenge(&self) -> Option<String> {
        None
    }

    /// Attempt to establish an identity from the request.
    ///
    /// Returns `Ok(None)` when the request carries no credential for this
    /// scheme, so the next mechanism can try.
    ///
    /// # Errors
    ///
    /// Propagates the identity resolver's verdict when a credential is
    /// present but does not verify.
    async fn authenticate(&self, req: &Request) -> Result<Option<SecurityContext>, AuthError>;
}

/// `Authorization: Basic` mechanism. Decodes the credential pair and hands it
/// to the identity resolver.
pub struct BasicAuthMechanism {
    realm: String,
    resolver: Arc<dyn IdentityResolver>,
}

impl BasicAuthMechanism {
    #[must_use]
    pub fn new(realm: impl Into<String>, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            realm: realm.into(),
            resolver,
        }
    }
}

#[async_trait]
impl AuthMechanism for BasicAuthMechanism {
    fn scheme(&self) -> &'static str {
        "basic"
    }

    fn priority(&self) -> i16 {
        10
    }

    fn challenge(&self) -> Option<String> {
        Some(format!("Basic realm=\"{}\"", self.realm))
    }

    async fn authenticate(&self, req: &Request) -> Result<Option<SecurityContext>, AuthError> {
        let Some((username, password)) = extract_basic_credentials(req.headers()) else {
            return Ok(None);
        };
        let credential = Credential::Basic {
            username,
            password: SecretString::from(password),
        };
        self.resolver.resolve(credential).await.map(Some)
    }
}

/// Mutual-TLS mechanism. The TLS acceptor asserts the peer identity as a
/// request extension; this mechanism only forwards it to the resolver.
pub struct MtlsAuthMechanism {
    resolver: Arc<dyn IdentityResolver>,
}

/// Peer identity extracted during the TLS handshake, inserted into request
/// extensions by the listener.
#[derive(Debug, Clone)]
pub struct PeerIdentity {
    pub subject: String,
}

impl MtlsAuthMechanism {
    #[must_use]
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl AuthMechanism for MtlsAuthMechanism {
    fn scheme(&self) -> &'static str {
        "x509"
    }

    fn priority(&self) -> i16 {
        30
    }

    async fn authenticate(&self, req: &Request) -> Result<Option<SecurityContext>, AuthError> {
        let Some(peer) = req.extensions().get::<PeerIdentity>() else {
            return Ok(None);
        };
        let credential = Credential::ClientCert {
            subject: peer.subject.clone(),
        };
        self.resolver.resolve(credential).await.map(Some)
    }
}

/// Decode the `Authorization: Basic` header into a `(username, password)`
/// pair. Any malformed header reads as "no credential".
fn extract_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Basic ").map(str::trim))?;
    let decoded = BASE64.decode(encoded).ok()?;
    let pair = String::from_utf8(decoded).ok()?;
    let (username, password) = pair.split_once(':')?;
    Some((username.to_owned(), password.to_owned()))
}
