#![allow(clippy::unwrap_used)]

//! Assembly-level behavior: mechanism installation decisions, filter chain
//! shape, interceptor table gating, named-policy aggregation, and
//! idempotence of the whole build phase.

use std::sync::Arc;

use async_trait::async_trait;

use http::Method;
use http_auth::registry::{Precedence, roles};
use http_auth::{
    AdvertisedScheme, AssemblyEnv, AssemblyError, FilterPriority, HttpAuthConfig,
    InterceptorCandidate, MethodGuard, NamedPolicyDecl, RouteSecurityPolicy, SecurityAssembly,
    TlsClientAuth, assemble,
};
use portcullis_security::{
    AuthError, Credential, IdentityResolver, MethodId, PolicyDecision, SecurityContext,
    SecurityPolicy,
};

struct RejectAll;

#[async_trait]
impl IdentityResolver for RejectAll {
    async fn resolve(&self, _credential: Credential) -> Result<SecurityContext, AuthError> {
        Err(AuthError::Unauthorized("invalid credentials".to_owned()))
    }
}

struct PermitAll;

#[async_trait]
impl SecurityPolicy for PermitAll {
    async fn check(&self, _ctx: &SecurityContext) -> PolicyDecision {
        PolicyDecision::Permit
    }
}

#[async_trait]
impl RouteSecurityPolicy for PermitAll {
    async fn check(
        &self,
        _method: &Method,
        _path: &str,
        _ctx: &SecurityContext,
    ) -> PolicyDecision {
        PolicyDecision::Permit
    }
}

struct NoopGuard;

#[async_trait]
impl MethodGuard for NoopGuard {
    async fn apply(&self, _extensions: &mut http::Extensions) -> Result<(), AuthError> {
        Ok(())
    }
}

fn env(security_capability: bool) -> AssemblyEnv {
    AssemblyEnv {
        security_capability,
        identity_resolver: Arc::new(RejectAll),
        route_policy: Arc::new(PermitAll),
    }
}

fn candidate(owner: &str, name: &str) -> InterceptorCandidate {
    InterceptorCandidate::new(MethodId::new(owner, name), Arc::new(NoopGuard))
}

fn policy_decl(name: &str) -> NamedPolicyDecl {
    NamedPolicyDecl::new(
        name,
        Arc::new(|| Arc::new(PermitAll) as Arc<dyn SecurityPolicy>),
    )
}

fn run(config: &HttpAuthConfig, security_capability: bool) -> SecurityAssembly {
    assemble(config, &env(security_capability), Vec::new(), Vec::new()).unwrap()
}

#[test]
fn explicit_basic_opt_out_installs_nothing() {
    let mut config = HttpAuthConfig::default();
    config.basic = Some(false);
    config.form.enabled = true;
    config.tls_client_auth = TlsClientAuth::Required;
    config.management.basic = Some(true);

    let assembly = run(&config, true);
    assert!(assembly.components.spec_named("BasicAuthMechanism").is_none());
}

#[test]
fn form_supersedes_the_unset_basic_default() {
    let mut config = HttpAuthConfig::default();
    config.form.enabled = true;

    let assembly = run(&config, true);
    assert!(assembly.components.spec_named("BasicAuthMechanism").is_none());

    let form = assembly.components.spec_named("FormAuthMechanism").unwrap();
    assert_eq!(form.precedence, Precedence::Explicit);
    assert!(form.unremovable);
}

#[test]
fn bare_config_installs_basic_as_the_fallback() {
    let assembly = run(&HttpAuthConfig::default(), true);
    let basic = assembly.components.spec_named("BasicAuthMechanism").unwrap();
    assert_eq!(basic.precedence, Precedence::Fallback);
}

#[test]
fn explicit_basic_is_advertised_exactly_once() {
    let mut config = HttpAuthConfig::default();
    config.basic = Some(true);

    let assembly = run(&config, true);
    let basic = assembly.components.spec_named("BasicAuthMechanism").unwrap();
    assert_eq!(basic.precedence, Precedence::Explicit);
    assert_eq!(assembly.advertised_schemes, vec![AdvertisedScheme::Basic]);
}

#[test]
fn form_auth_suppresses_the_basic_advertisement() {
    let mut config = HttpAuthConfig::default();
    config.basic = Some(true);
    config.form.enabled = true;

    let assembly = run(&config, true);
    assert!(assembly.advertised_schemes.is_empty());
}

#[test]
fn mtls_mechanism_is_registered_when_client_auth_is_on() {
    let mut config = HttpAuthConfig::default();
    config.tls_client_auth = TlsClientAuth::Request;

    let assembly = run(&config, true);
    let mtls = assembly.components.spec_named("MtlsAuthMechanism").unwrap();
    assert!(mtls.unremovable);
    assert_eq!(mtls.role, roles::AUTH_MECHANISM);
}

#[test]
fn missing_capability_installs_no_filters() {
    let assembly = run(&HttpAuthConfig::default(), false);
    assert!(assembly.filters.is_empty());
    assert!(assembly.interceptors.is_none());
    // mechanism registrations still happen; only the pipeline stays out
    assert!(assembly.components.spec_named("BasicAuthMechanism").is_some());
    assert!(assembly.components.spec_named("HttpAuthenticator").is_none());
}

#[test]
fn capability_installs_one_filter_per_priority() {
    let assembly = run(&HttpAuthConfig::default(), true);
    assert_eq!(assembly.filters.len(), 2);

    let authn = assembly
        .filters
        .iter()
        .filter(|f| f.priority() == FilterPriority::Authentication)
        .count();
    let authz = assembly
        .filters
        .iter()
        .filter(|f| f.priority() == FilterPriority::Authorization)
        .count();
    assert_eq!((authn, authz), (1, 1));

    for root in [
        "HttpAuthenticator",
        "HttpAuthorizer",
        "RoutePolicyMatcher",
        "BlockingPolicyExecutor",
    ] {
        assert!(
            assembly.components.reachability_roots().contains(&root),
            "{root} must be a reachability root"
        );
    }
}

#[test]
fn login_route_exists_only_for_non_proactive_form_auth() {
    let mut config = HttpAuthConfig::default();
    config.form.enabled = true;

    let proactive = run(&config, true);
    assert!(proactive.login_route.is_none());

    config.proactive = false;
    let deferred = run(&config, true);
    let route = deferred.login_route.unwrap();
    assert_eq!(route.path(), "/auth/login");
}

#[test]
fn interceptor_table_requires_deferred_auth_and_candidates() {
    let mut config = HttpAuthConfig::default();
    config.proactive = false;

    let empty = assemble(&config, &env(true), Vec::new(), Vec::new()).unwrap();
    assert!(empty.interceptors.is_none());

    let candidates = vec![
        candidate("users::UserService", "list"),
        candidate("users::UserService", "create"),
    ];
    let built = assemble(&config, &env(true), candidates.clone(), Vec::new()).unwrap();
    let table = built.interceptors.unwrap();
    assert_eq!(table.len(), 2);
    assert!(table.is_secured(&MethodId::new("users::UserService", "list")));

    config.proactive = true;
    let proactive = assemble(&config, &env(true), candidates, Vec::new()).unwrap();
    assert!(proactive.interceptors.is_none());
}

#[test]
fn duplicate_interceptor_candidates_abort_the_assembly() {
    let mut config = HttpAuthConfig::default();
    config.proactive = false;

    let candidates = vec![
        candidate("users::UserService", "list"),
        candidate("users::UserService", "list"),
    ];
    let err = assemble(&config, &env(true), candidates, Vec::new()).unwrap_err();
    assert!(matches!(err, AssemblyError::DuplicateInterceptor { .. }));
}

#[test]
fn named_policies_publish_only_when_declared() {
    let none = assemble(
        &HttpAuthConfig::default(),
        &env(true),
        Vec::new(),
        Vec::new(),
    )
    .unwrap();
    assert!(none.named_policies.is_none());

    let some = assemble(
        &HttpAuthConfig::default(),
        &env(true),
        Vec::new(),
        vec![policy_decl("admin-only"), policy_decl("tenant-scoped")],
    )
    .unwrap();
    let policies = some.named_policies.unwrap();
    assert_eq!(policies.len(), 2);
    assert!(policies.get("admin-only").is_some());
}

#[test]
fn duplicate_policy_names_abort_the_assembly() {
    let err = assemble(
        &HttpAuthConfig::default(),
        &env(true),
        Vec::new(),
        vec![policy_decl("admin-only"), policy_decl("admin-only")],
    )
    .unwrap_err();
    match err {
        AssemblyError::DuplicatePolicyName { name } => assert_eq!(name, "admin-only"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reassembly_reproduces_identical_decisions() {
    let mut config = HttpAuthConfig::default();
    config.proactive = false;
    config.form.enabled = true;

    let candidates = || {
        vec![
            candidate("users::UserService", "list"),
            candidate("orders::OrderService", "create"),
        ]
    };
    let declarations = || vec![policy_decl("admin-only")];

    let first = assemble(&config, &env(true), candidates(), declarations()).unwrap();
    let second = assemble(&config, &env(true), candidates(), declarations()).unwrap();

    let fingerprint = |assembly: &SecurityAssembly| {
        let specs: Vec<_> = assembly
            .components
            .specs()
            .map(|s| (s.name, s.role, s.precedence, s.unremovable))
            .collect();
        let priorities: Vec<_> = assembly.filters.iter().map(|f| f.priority()).collect();
        let mut methods: Vec<String> = assembly
            .interceptors
            .as_ref()
            .map(|table| table.methods().map(ToString::to_string).collect())
            .unwrap_or_default();
        methods.sort();
        let mut policy_names: Vec<String> = assembly
            .named_policies
            .as_ref()
            .map(|p| p.names().map(str::to_owned).collect())
            .unwrap_or_default();
        policy_names.sort();
        (
            specs,
            priorities,
            methods,
            policy_names,
            assembly.advertised_schemes.clone(),
        )
    };

    assert_eq!(fingerprint(&first), fingerprint(&second));
}
