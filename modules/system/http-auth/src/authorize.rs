//! Authorization filter: applies the route-matched security policy after
//! authentication, triggering deferred authentication when needed.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{Method, StatusCode};

use portcullis_security::{AuthError, PolicyDecision, SecurityContext};

use crate::authenticate::{DeferredAuthentication, auth_error_response, is_preflight_request};
use crate::problem::Problem;

/// The route-matched authorization entry point.
///
/// Implemented outside this crate by the matcher that maps routes to
/// policies (consuming, among other things, the named-policy registry this
/// crate publishes). The authorization filter calls it once per request.
#[async_trait]
pub trait RouteSecurityPolicy: Send + Sync {
    /// Decide whether the given identity may access the given route.
    async fn check(&self, method: &Method, path: &str, ctx: &SecurityContext) -> PolicyDecision;
}

/// Applies the route-matched security policy to the established identity.
pub struct HttpAuthorizer {
    policy: Arc<dyn RouteSecurityPolicy>,
}

impl HttpAuthorizer {
    #[must_use]
    pub fn new(policy: Arc<dyn RouteSecurityPolicy>) -> Self {
        Self { policy }
    }

    pub async fn check(
        &self,
        method: &Method,
        path: &str,
        ctx: &SecurityContext,
    ) -> PolicyDecision {
        self.policy.check(method, path, ctx).await
    }
}

/// Shared state for the authorization middleware.
#[derive(Clone)]
pub struct AuthzState {
    pub authorizer: Arc<HttpAuthorizer>,
}

/// Authorization middleware. Runs strictly after the authentication filter
/// for every request; the filter priorities guarantee the ordering.
///
/// A denial for an anonymous identity first triggers deferred authentication
/// when a [`DeferredAuthentication`] handle is present, so that non-proactive
/// assemblies authenticate exactly at the point of need.
pub async fn authorization_middleware(
    State(state): State<AuthzState>,
    mut req: Request,
    next: Next,
) -> Response {
    if is_preflight_request(req.method(), req.headers()) {
        return next.run(req).await;
    }

    let Some(ctx) = req.extensions().get::<SecurityContext>().cloned() else {
        tracing::error!("SecurityContext missing; authentication filter not installed");
        return Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Security pipeline misconfigured",
        )
        .into_response();
    };

    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    match state.authorizer.check(&method, &path, &ctx).await {
        PolicyDecision::Permit => next.run(req).await,
        PolicyDecision::Deny => {
            let deferred = req.extensions().get::<DeferredAuthentication>().cloned();
            if ctx.is_anonymous()
                && let Some(deferred) = deferred
            {
                authenticate_and_recheck(&state, deferred, &method, &path, req, next).await
            } else if ctx.is_anonymous() {
                auth_error_response(
                    &AuthError::Unauthorized("authentication required".to_owned()),
                    None,
                )
            } else {
                tracing::debug!(subject = %ctx.subject_id(), path = %path, "authorization denied");
                Problem::new(StatusCode::FORBIDDEN, "Forbidden", "Access denied").into_response()
            }
        }
    }
}

/// Deferred path: establish the identity now, then re-apply the policy.
async fn authenticate_and_recheck(
    state: &AuthzState,
    deferred: DeferredAuthentication,
    method: &Method,
    path: &str,
    mut req: Request,
    next: Next,
) -> Response {
    let authenticator = deferred.authenticator();
    match authenticator.authenticate(&req).await {
        Ok(Some(established)) => {
            match state.authorizer.check(method, path, &established).await {
                PolicyDecision::Permit => {
                    req.extensions_mut().insert(established);
                    next.run(req).await
                }
                PolicyDecision::Deny => {
                    tracing::debug!(
                        subject = %established.subject_id(),
                        path = %path,
                        "authorization denied after deferred authentication"
                    );
                    Problem::new(StatusCode::FORBIDDEN, "Forbidden", "Access denied")
                        .into_response()
                }
            }
        }
        Ok(None) => auth_error_response(
            &AuthError::Unauthorized("authentication required".to_owned()),
            authenticator.challenge(),
        ),
        Err(err) => auth_error_response(&err, authenticator.challenge()),
    }
}
