//! Form-based authentication: session-cookie mechanism plus the standalone
//! login route.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Form, Request};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{MethodRouter, post};
use http::{HeaderMap, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use portcullis_security::{AuthError, Credential, IdentityResolver};
use portcullis_security::SecurityContext;

use crate::config::FormAuthConfig;
use crate::problem::Problem;

/// Form authentication mechanism.
///
/// Ordinary requests are authenticated through the session cookie issued at
/// login; the login itself happens on the standalone POST route produced by
/// [`login_route`].
pub struct FormAuthMechanism {
    post_location: String,
    cookie_name: String,
    landing: String,
    resolver: Arc<dyn IdentityResolver>,
}

impl FormAuthMechanism {
    #[must_use]
    pub fn new(config: &FormAuthConfig, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            post_location: config.post_location.clone(),
            cookie_name: config.cookie_name.clone(),
            landing: config.landing.clone(),
            resolver,
        }
    }

    /// POST path handling login form submissions.
    #[must_use]
    pub fn post_location(&self) -> &str {
        &self.post_location
    }

    async fn handle_login(&self, form: LoginForm) -> Response {
        let credential = Credential::Form {
            username: form.username,
            password: SecretString::from(form.password),
        };
        let ctx = match self.resolver.resolve(credential).await {
            Ok(ctx) => ctx,
            Err(err) => {
                tracing::debug!(error = %err, "form login rejected");
                return Problem::new(
                    StatusCode::UNAUTHORIZED,
                    "Unauthorized",
                    "Authentication failed",
                )
                .into_response();
            }
        };
        match self.resolver.issue_session(&ctx).await {
            Ok(session) => {
                let cookie = format!(
                    "{}={}; Path=/; HttpOnly; SameSite=Strict",
                    self.cookie_name,
                    session.expose_secret()
                );
                ([(header::SET_COOKIE, cookie)], Redirect::to(&self.landing)).into_response()
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to issue form session");
                Problem::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "Session could not be established",
                )
                .into_response()
            }
        }
    }
}

#[async_trait]
impl super::mechanism::AuthMechanism for FormAuthMechanism {
    fn scheme(&self) -> &'static str {
        "form"
    }

    fn priority(&self) -> i16 {
        20
    }

    async fn authenticate(&self, req: &Request) -> Result<Option<SecurityContext>, AuthError> {
        let Some(session) = session_cookie(req.headers(), &self.cookie_name) else {
            return Ok(None);
        };
        let credential = Credential::Session(SecretString::from(session.to_owned()));
        self.resolver.resolve(credential).await.map(Some)
    }
}

/// Login form fields posted to the configured location.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// A standalone route produced by the assembly, mounted by the consuming
/// router outside the filter chain.
pub struct LoginRoute {
    path: String,
    handler: MethodRouter,
}

impl LoginRoute {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Mount this route onto the given router.
    #[must_use]
    pub fn mount(self, router: Router) -> Router {
        router.route(&self.path, self.handler)
    }
}

/// Build the POST login route for the given form mechanism.
///
/// Only meaningful when authentication is not proactive; with proactive
/// authentication the form credential is picked up by the filter chain
/// itself.
#[must_use]
pub fn login_route(mechanism: Arc<FormAuthMechanism>) -> LoginRoute {
    let path = mechanism.post_location.clone();
    let handler = post(move |Form(form): Form<LoginForm>| {
        let mechanism = Arc::clone(&mechanism);
        async move { mechanism.handle_login(form).await }
    });
    LoginRoute { path, handler }
}

/// Find the named cookie in the request's `Cookie` headers.
fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else { continue };
        for pair in value.split(';') {
            if let Some(rest) = pair.trim().strip_prefix(name)
                && let Some(session) = rest.strip_prefix('=')
            {
                return Some(session);
            }
        }
    }
    None
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; portcullis-credential=sess-1; lang=en"
                .parse()
                .unwrap(),
        );
        assert_eq!(
            session_cookie(&headers, "portcullis-credential"),
            Some("sess-1")
        );
    }

    #[test]
    fn missing_cookie_reads_as_no_credential() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers, "portcullis-credential"), None);

        headers.insert(header::COOKIE, "theme=dark".parse().unwrap());
        assert_eq!(session_cookie(&headers, "portcullis-credential"), None);
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "portcullis-credential-old=stale".parse().unwrap(),
        );
        // prefix match alone is not enough; the separator must follow the name
        assert_eq!(session_cookie(&headers, "portcullis-credential"), None);
    }
}
