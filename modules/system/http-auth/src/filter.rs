//! Ordered security filter entries and their installation onto a router.

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;

use crate::authenticate::{AuthnState, HttpAuthenticator, authentication_middleware};
use crate::authorize::{AuthzState, HttpAuthorizer, authorization_middleware};
use crate::config::HttpAuthConfig;

/// Scheduling priority of a security filter. The consuming router runs
/// entries with a higher order value earlier on the request path, regardless
/// of registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPriority {
    Authentication,
    Authorization,
}

impl FilterPriority {
    /// Numeric scheduling order; higher runs first.
    #[must_use]
    pub const fn order(self) -> i32 {
        match self {
            Self::Authentication => 200,
            Self::Authorization => 100,
        }
    }
}

type ApplyFn = Box<dyn FnOnce(Router) -> Router + Send>;

/// One security filter to be scheduled by the consuming router.
pub struct FilterEntry {
    priority: FilterPriority,
    name: &'static str,
    apply: ApplyFn,
}

impl FilterEntry {
    fn new(priority: FilterPriority, name: &'static str, apply: ApplyFn) -> Self {
        Self {
            priority,
            name,
            apply,
        }
    }

    #[must_use]
    pub fn priority(&self) -> FilterPriority {
        self.priority
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Layer this filter onto the router.
    #[must_use]
    pub fn apply(self, router: Router) -> Router {
        (self.apply)(router)
    }
}

/// Build the security filter chain.
///
/// Without the security capability the request pipeline stays
/// security-agnostic and no filters are installed. With it, exactly two
/// entries are produced: the authentication filter (honoring
/// `config.proactive`) and the authorization filter.
#[must_use]
pub fn build_filters(
    config: &HttpAuthConfig,
    security_capability: bool,
    authenticator: Arc<HttpAuthenticator>,
    authorizer: Arc<HttpAuthorizer>,
) -> Vec<FilterEntry> {
    if !security_capability {
        return Vec::new();
    }

    let authn_state = AuthnState {
        authenticator,
        proactive: config.proactive,
    };
    let authz_state = AuthzState { authorizer };

    vec![
        FilterEntry::new(
            FilterPriority::Authentication,
            "http-authentication",
            Box::new(move |router| {
                router.layer(from_fn_with_state(authn_state, authentication_middleware))
            }),
        ),
        FilterEntry::new(
            FilterPriority::Authorization,
            "http-authorization",
            Box::new(move |router| {
                router.layer(from_fn_with_state(authz_state, authorization_middleware))
            }),
        ),
    ]
}

/// Layer the given entries onto a router so that higher-order entries run
/// earlier on the request path.
///
/// IMPORTANT: `axum::Router::layer(...)` behaves like Tower layers: the
/// **last** added layer becomes the **outermost** layer and therefore runs
/// **first** on the request path. Entries are therefore applied in ascending
/// order, which puts authentication outside authorization for every request.
#[must_use]
pub fn install(mut entries: Vec<FilterEntry>, router: Router) -> Router {
    entries.sort_by_key(|entry| entry.priority().order());
    entries
        .into_iter()
        .fold(router, |router, entry| entry.apply(router))
}
