//! Authentication filter: mechanism ordering, the request middleware, and the
//! deferred-authentication handle used when authentication is not proactive.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use portcullis_security::{AuthError, SecurityContext};

use crate::mechanism::AuthMechanism;
use crate::problem::Problem;

/// Runs the installed mechanisms in priority order until one establishes an
/// identity.
///
/// Built once at assembly time from the component registry's active
/// mechanisms; shared read-only across request-handling threads.
pub struct HttpAuthenticator {
    mechanisms: Vec<Arc<dyn AuthMechanism>>,
}

impl HttpAuthenticator {
    /// Order mechanisms by descending priority; equal priorities keep their
    /// registration order.
    #[must_use]
    pub fn new(mut mechanisms: Vec<Arc<dyn AuthMechanism>>) -> Self {
        mechanisms.sort_by_key(|m| std::cmp::Reverse(m.priority()));
        Self { mechanisms }
    }

    #[must_use]
    pub fn mechanisms(&self) -> &[Arc<dyn AuthMechanism>] {
        &self.mechanisms
    }

    /// Attempt every mechanism in order; the first one that finds a
    /// credential decides the outcome.
    ///
    /// # Errors
    ///
    /// Propagates the failing mechanism's error; later mechanisms are not
    /// consulted once a credential was found.
    pub async fn authenticate(
        &self,
        req: &Request,
    ) -> Result<Option<SecurityContext>, AuthError> {
        for mechanism in &self.mechanisms {
            if let Some(ctx) = mechanism.authenticate(req).await? {
                tracing::debug!(scheme = mechanism.scheme(), "request authenticated");
                return Ok(Some(ctx));
            }
        }
        Ok(None)
    }

    /// Challenge of the highest-priority mechanism that defines one.
    #[must_use]
    pub fn challenge(&self) -> Option<String> {
        self.mechanisms.iter().find_map(|m| m.challenge())
    }
}

/// Handle stored in request extensions when authentication is deferred:
/// identification happens only when an authorization check or an eager
/// method guard demands it.
#[derive(Clone)]
pub struct DeferredAuthentication {
    authenticator: Arc<HttpAuthenticator>,
}

impl DeferredAuthentication {
    #[must_use]
    pub fn new(authenticator: Arc<HttpAuthenticator>) -> Self {
        Self { authenticator }
    }

    #[must_use]
    pub fn authenticator(&self) -> &Arc<HttpAuthenticator> {
        &self.authenticator
    }
}

/// Shared state for the authentication middleware.
#[derive(Clone)]
pub struct AuthnState {
    pub authenticator: Arc<HttpAuthenticator>,
    pub proactive: bool,
}

/// Authentication middleware.
///
/// For each request:
/// 1. Skips CORS preflight requests
/// 2. Proactive mode: attempts every mechanism, inserts the resulting
///    `SecurityContext` (anonymous when no credential is present), answers
///    401 with the scheme challenge on failure
/// 3. Deferred mode: inserts an anonymous context plus a
///    [`DeferredAuthentication`] handle for the authorization filter and
///    eager method guards
pub async fn authentication_middleware(
    State(state): State<AuthnState>,
    mut req: Request,
    next: Next,
) -> Response {
    // Skip CORS preflight
    if is_preflight_request(req.method(), req.headers()) {
        return next.run(req).await;
    }

    if state.proactive {
        match state.authenticator.authenticate(&req).await {
            Ok(Some(ctx)) => {
                req.extensions_mut().insert(ctx);
            }
            Ok(None) => {
                req.extensions_mut().insert(SecurityContext::anonymous());
            }
            Err(err) => {
                return auth_error_response(&err, state.authenticator.challenge());
            }
        }
    } else {
        req.extensions_mut().insert(SecurityContext::anonymous());
        req.extensions_mut()
            .insert(DeferredAuthentication::new(Arc::clone(&state.authenticator)));
    }

    next.run(req).await
}

/// Convert an `AuthError` into an RFC 9457 problem response, attaching the
/// scheme challenge on 401.
pub(crate) fn auth_error_response(err: &AuthError, challenge: Option<String>) -> Response {
    log_auth_error(err);
    let (status, title, detail) = match err {
        AuthError::Unauthorized(_) => (
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Authentication failed",
        ),
        AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden", "Access denied"),
        AuthError::ServiceUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable",
            "Identity provider unavailable",
        ),
        AuthError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Internal authentication error",
        ),
    };
    let mut response = Problem::new(status, title, detail).into_response();
    if status == StatusCode::UNAUTHORIZED
        && let Some(challenge) = challenge
        && let Ok(value) = HeaderValue::from_str(&challenge)
    {
        response
            .headers_mut()
            .insert(http::header::WWW_AUTHENTICATE, value);
    }
    response
}

/// Log authentication errors at appropriate levels.
fn log_auth_error(err: &AuthError) {
    match err {
        AuthError::Unauthorized(msg) => tracing::debug!("authentication rejected: {msg}"),
        AuthError::Forbidden(msg) => tracing::debug!("authentication forbidden: {msg}"),
        AuthError::ServiceUnavailable(msg) => {
            tracing::error!("identity provider unavailable: {msg}");
        }
        AuthError::Internal(msg) => tracing::error!("internal authentication error: {msg}"),
    }
}

/// Check if this is a CORS preflight request
///
/// Preflight requests are OPTIONS requests with:
/// - Origin header present
/// - Access-Control-Request-Method header present
pub(crate) fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(http::header::ORIGIN)
        && headers.contains_key(http::header::ACCESS_CONTROL_REQUEST_METHOD)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Inert {
        scheme: &'static str,
        priority: i16,
    }

    #[async_trait]
    impl AuthMechanism for Inert {
        fn scheme(&self) -> &'static str {
            self.scheme
        }

        fn priority(&self) -> i16 {
            self.priority
        }

        async fn authenticate(
            &self,
            _req: &Request,
        ) -> Result<Option<SecurityContext>, AuthError> {
            Ok(None)
        }
    }

    #[test]
    fn mechanisms_are_ordered_by_descending_priority() {
        let authenticator = HttpAuthenticator::new(vec![
            Arc::new(Inert {
                scheme: "basic",
                priority: 10,
            }),
            Arc::new(Inert {
                scheme: "x509",
                priority: 30,
            }),
            Arc::new(Inert {
                scheme: "form",
                priority: 20,
            }),
        ]);
        let order: Vec<_> = authenticator
            .mechanisms()
            .iter()
            .map(|m| m.scheme())
            .collect();
        assert_eq!(order, vec!["x509", "form", "basic"]);
    }

    #[test]
    fn preflight_detection_requires_all_markers() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::ORIGIN, "https://example.com".parse().unwrap());
        assert!(!is_preflight_request(&Method::OPTIONS, &headers));

        headers.insert(
            http::header::ACCESS_CONTROL_REQUEST_METHOD,
            "POST".parse().unwrap(),
        );
        assert!(is_preflight_request(&Method::OPTIONS, &headers));
        assert!(!is_preflight_request(&Method::GET, &headers));
    }

    #[test]
    fn challenge_comes_from_highest_priority_mechanism() {
        struct WithChallenge;
        #[async_trait]
        impl AuthMechanism for WithChallenge {
            fn scheme(&self) -> &'static str {
                "basic"
            }
            fn priority(&self) -> i16 {
                10
            }
            fn challenge(&self) -> Option<String> {
                Some("Basic realm=\"portcullis\"".to_owned())
            }
            async fn authenticate(
                &self,
                _req: &Request,
            ) -> Result<Option<SecurityContext>, AuthError> {
                Ok(None)
            }
        }

        let authenticator = HttpAuthenticator::new(vec![
            Arc::new(Inert {
                scheme: "x509",
                priority: 30,
            }),
            Arc::new(WithChallenge),
        ]);
        assert_eq!(
            authenticator.challenge().as_deref(),
            Some("Basic realm=\"portcullis\"")
        );

        // no mechanism defines one
        let bare = HttpAuthenticator::new(vec![Arc::new(Inert {
            scheme: "x509",
            priority: 30,
        })]);
        assert_eq!(bare.challenge(), None);
    }
}
