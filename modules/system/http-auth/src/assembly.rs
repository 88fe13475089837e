//! The one-shot assembly phase.
//!
//! Runs once, single-threaded, before the server starts serving traffic:
//! mechanism resolution, component registration, filter chain construction,
//! eager interceptor collection, and named-policy aggregation. Everything it
//! publishes is immutable from that point on, so the multi-threaded serving
//! runtime reads it without synchronization.

use std::sync::Arc;

use portcullis_security::IdentityResolver;

use crate::authenticate::HttpAuthenticator;
use crate::authorize::{HttpAuthorizer, RouteSecurityPolicy};
use crate::config::HttpAuthConfig;
use crate::error::AssemblyError;
use crate::filter::{FilterEntry, build_filters};
use crate::form::{FormAuthMechanism, LoginRoute, login_route};
use crate::interceptor::{InterceptorCandidate, InterceptorTable, build_interceptor_table};
use crate::mechanism::{
    AdvertisedScheme, BasicAuthMechanism, BasicInstallation, MtlsAuthMechanism,
    basic_installation,
};
use crate::policy::{NamedPolicies, NamedPolicyDecl, collect_named_policies};
use crate::registry::{ComponentRegistry, ComponentSpec, Precedence, Scope, roles};

/// Collaborator seams consumed during assembly.
#[derive(Clone)]
pub struct AssemblyEnv {
    /// Whether a security extension is present in the assembly at all; when
    /// absent, the request pipeline stays security-agnostic.
    pub security_capability: bool,
    /// The external identity provider behind every mechanism.
    pub identity_resolver: Arc<dyn IdentityResolver>,
    /// The route-matched policy entry point applied by the authorization
    /// filter.
    pub route_policy: Arc<dyn RouteSecurityPolicy>,
}

/// Everything one assembly run publishes for the serving runtime.
pub struct SecurityAssembly {
    /// Ordered filter entries; empty without the security capability.
    pub filters: Vec<FilterEntry>,
    /// Standalone form-login route, present when form auth is enabled and
    /// authentication is not proactive.
    pub login_route: Option<LoginRoute>,
    /// Component registration requests for the external container.
    pub components: ComponentRegistry,
    /// Eager per-method interceptor table, when applicable.
    pub interceptors: Option<Arc<InterceptorTable>>,
    /// Name → policy-supplier mapping, absent when nothing was declared.
    pub named_policies: Option<Arc<NamedPolicies>>,
    /// Informational scheme advertisements for documentation/introspection.
    pub advertised_schemes: Vec<AdvertisedScheme>,
}

/// Assemble the HTTP security pipeline.
///
/// Pure over its inputs: re-running with the same configuration, candidate
/// list, and declarations produces identical decisions and mappings.
///
/// # Errors
///
/// Any [`AssemblyError`] aborts the whole assembly; no partial pipeline is
/// published.
pub fn assemble(
    config: &HttpAuthConfig,
    env: &AssemblyEnv,
    candidates: Vec<InterceptorCandidate>,
    policies: Vec<NamedPolicyDecl>,
) -> Result<SecurityAssembly, AssemblyError> {
    let named_policies = collect_named_policies(policies)?.map(Arc::new);

    let mut components = ComponentRegistry::new();
    let login_route = install_mechanisms(config, env, &mut components);

    let mut advertised_schemes = Vec::new();
    if !config.form.enabled && config.basic == Some(true) {
        advertised_schemes.push(AdvertisedScheme::Basic);
    }

    if env.security_capability {
        register_core_components(&mut components);
    }

    // Surface role conflicts before anything is published.
    for role in [
        roles::AUTHENTICATOR,
        roles::AUTHORIZER,
        roles::ROUTE_POLICY,
        roles::BLOCKING_EXECUTOR,
    ] {
        components.resolve_unique(role)?;
    }

    let authenticator = Arc::new(HttpAuthenticator::new(components.active_mechanisms()));
    let authorizer = Arc::new(HttpAuthorizer::new(Arc::clone(&env.route_policy)));
    let filters = build_filters(
        config,
        env.security_capability,
        Arc::clone(&authenticator),
        authorizer,
    );

    let interceptors =
        build_interceptor_table(candidates, config.proactive, env.security_capability)?;

    tracing::info!(
        proactive = config.proactive,
        mechanisms = authenticator.mechanisms().len(),
        filters = filters.len(),
        interceptors = interceptors.as_ref().map_or(0, |table| table.len()),
        named_policies = named_policies.as_ref().map_or(0, |policies| policies.len()),
        "HTTP security pipeline assembled"
    );

    Ok(SecurityAssembly {
        filters,
        login_route,
        components,
        interceptors,
        named_policies,
        advertised_schemes,
    })
}

/// Install the configured mechanisms, honoring the basic-installation
/// decision. Runs regardless of the security capability: mechanism beans
/// exist even when the filter pipeline stays out.
fn install_mechanisms(
    config: &HttpAuthConfig,
    env: &AssemblyEnv,
    components: &mut ComponentRegistry,
) -> Option<LoginRoute> {
    let mut route = None;

    if config.form.enabled {
        let mechanism = Arc::new(FormAuthMechanism::new(
            &config.form,
            Arc::clone(&env.identity_resolver),
        ));
        if !config.proactive {
            route = Some(login_route_for(&mechanism));
        }
        components.register_mechanism(
            ComponentSpec {
                name: "FormAuthMechanism",
                role: roles::AUTH_MECHANISM,
                precedence: Precedence::Explicit,
                scope: Scope::Singleton,
                unremovable: true,
            },
            mechanism,
        );
    }

    if config.mtls_enabled() {
        components.register_mechanism(
            ComponentSpec {
                name: "MtlsAuthMechanism",
                role: roles::AUTH_MECHANISM,
                precedence: Precedence::Explicit,
                scope: Scope::Singleton,
                unremovable: true,
            },
            Arc::new(MtlsAuthMechanism::new(Arc::clone(&env.identity_resolver))),
        );
    }

    let installation = basic_installation(config);
    if installation != BasicInstallation::Skipped {
        let precedence = if installation == BasicInstallation::Explicit {
            Precedence::Explicit
        } else {
            Precedence::Fallback
        };
        components.register_mechanism(
            ComponentSpec {
                name: "BasicAuthMechanism",
                role: roles::AUTH_MECHANISM,
                precedence,
                scope: Scope::Singleton,
                unremovable: false,
            },
            Arc::new(BasicAuthMechanism::new(
                config.realm.clone(),
                Arc::clone(&env.identity_resolver),
            )),
        );
    }

    route
}

/// The capability-gated core of the pipeline: authenticator, authorizer,
/// route-policy matcher, and the executor that offloads blocking policy
/// checks. All registered as reachability roots, since the filters look
/// them up dynamically.
fn register_core_components(components: &mut ComponentRegistry) {
    components.register(ComponentSpec {
        name: "HttpAuthenticator",
        role: roles::AUTHENTICATOR,
        precedence: Precedence::Explicit,
        scope: Scope::Application,
        unremovable: true,
    });
    components.register(ComponentSpec {
        name: "HttpAuthorizer",
        role: roles::AUTHORIZER,
        precedence: Precedence::Explicit,
        scope: Scope::Application,
        unremovable: true,
    });
    components.register(ComponentSpec {
        name: "RoutePolicyMatcher",
        role: roles::ROUTE_POLICY,
        precedence: Precedence::Explicit,
        scope: Scope::Application,
        unremovable: true,
    });
    components.register(ComponentSpec {
        name: "BlockingPolicyExecutor",
        role: roles::BLOCKING_EXECUTOR,
        precedence: Precedence::Explicit,
        scope: Scope::Application,
        unremovable: true,
    });
}

fn login_route_for(mechanism: &Arc<FormAuthMechanism>) -> LoginRoute {
    tracing::debug!(
        path = mechanism.post_location(),
        "registering form login route"
    );
    login_route(Arc::clone(mechanism))
}
