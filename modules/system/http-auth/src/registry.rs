//! Component registration requests handed to the external container.
//!
//! Models the fallback-implementation pattern explicitly: every registration
//! carries a precedence tag, fallback entries for a role are active only
//! while the role has no explicit entries, and unremovable registrations are
//! published as reachability roots for whatever dead-code-elimination stage
//! the target system runs. Mechanisms discovered through this registry must
//! survive elimination even when nothing references them statically.

use std::sync::Arc;

use crate::error::AssemblyError;
use crate::mechanism::AuthMechanism;

/// Precedence of a component registration for its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Used only when the role has no explicit registration.
    Fallback,
    /// Explicitly configured; supersedes every fallback for the role.
    Explicit,
}

/// Requested lifecycle scope of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Singleton,
    Application,
}

/// Registration request for one component.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    /// Component name, unique per registration.
    pub name: &'static str,
    /// Role the component implements; see [`roles`].
    pub role: &'static str,
    pub precedence: Precedence,
    pub scope: Scope,
    /// Unremovable components are published as reachability roots so that
    /// capability-based lookup keeps working after dead-code elimination.
    pub unremovable: bool,
}

/// Well-known component roles.
pub mod roles {
    /// HTTP authentication mechanism; a multi-slot role: several explicit
    /// mechanisms coexist, and the fallback is active only alone.
    pub const AUTH_MECHANISM: &str = "auth-mechanism";
    pub const AUTHENTICATOR: &str = "http-authenticator";
    pub const AUTHORIZER: &str = "http-authorizer";
    pub const ROUTE_POLICY: &str = "route-policy";
    pub const BLOCKING_EXECUTOR: &str = "blocking-policy-executor";
}

struct Entry {
    spec: ComponentSpec,
    mechanism: Option<Arc<dyn AuthMechanism>>,
}

/// The registration ledger built once per assembly.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: Vec<Entry>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plain component.
    pub fn register(&mut self, spec: ComponentSpec) {
        tracing::debug!(
            name = spec.name,
            role = spec.role,
            precedence = ?spec.precedence,
            unremovable = spec.unremovable,
            "component registered"
        );
        self.entries.push(Entry {
            spec,
            mechanism: None,
        });
    }

    /// Register an authentication mechanism together with its live instance.
    pub fn register_mechanism(&mut self, spec: ComponentSpec, mechanism: Arc<dyn AuthMechanism>) {
        tracing::debug!(
            name = spec.name,
            scheme = mechanism.scheme(),
            precedence = ?spec.precedence,
            "authentication mechanism registered"
        );
        self.entries.push(Entry {
            spec,
            mechanism: Some(mechanism),
        });
    }

    /// All registration requests, in registration order.
    pub fn specs(&self) -> impl Iterator<Item = &ComponentSpec> {
        self.entries.iter().map(|entry| &entry.spec)
    }

    /// Look up a registration by component name.
    #[must_use]
    pub fn spec_named(&self, name: &str) -> Option<&ComponentSpec> {
        self.specs().find(|spec| spec.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The mechanism instances active for this assembly: explicit mechanisms
    /// when any are registered, the fallbacks otherwise.
    #[must_use]
    pub fn active_mechanisms(&self) -> Vec<Arc<dyn AuthMechanism>> {
        let mechanisms: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|entry| entry.spec.role == roles::AUTH_MECHANISM && entry.mechanism.is_some())
            .collect();
        let has_explicit = mechanisms
            .iter()
            .any(|entry| entry.spec.precedence == Precedence::Explicit);
        mechanisms
            .into_iter()
            .filter(|entry| !has_explicit || entry.spec.precedence == Precedence::Explicit)
            .filter_map(|entry| entry.mechanism.clone())
            .collect()
    }

    /// Resolve the single active implementation of a single-slot role.
    ///
    /// # Errors
    ///
    /// `AmbiguousComponent` when more than one registration stays active for
    /// the role after precedence is applied; such a conflict must be
    /// surfaced, never silently resolved.
    pub fn resolve_unique(
        &self,
        role: &'static str,
    ) -> Result<Option<&ComponentSpec>, AssemblyError> {
        let candidates: Vec<&ComponentSpec> = self
            .specs()
            .filter(|spec| spec.role == role)
            .collect();
        let has_explicit = candidates
            .iter()
            .any(|spec| spec.precedence == Precedence::Explicit);
        let active: Vec<&ComponentSpec> = candidates
            .into_iter()
            .filter(|spec| !has_explicit || spec.precedence == Precedence::Explicit)
            .collect();
        match active.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(single)),
            [first, second, ..] => Err(AssemblyError::AmbiguousComponent {
                role,
                first: first.name,
                second: second.name,
            }),
        }
    }

    /// Names of unremovable components, deduplicated, in registration order.
    #[must_use]
    pub fn reachability_roots(&self) -> Vec<&'static str> {
        let mut roots = Vec::new();
        for spec in self.specs() {
            if spec.unremovable && !roots.contains(&spec.name) {
                roots.push(spec.name);
            }
        }
        roots
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::extract::Request;
    use portcullis_security::{AuthError, SecurityContext};

    struct Named(&'static str);

    #[async_trait]
    impl AuthMechanism for Named {
        fn scheme(&self) -> &'static str {
            self.0
        }

        async fn authenticate(
            &self,
            _req: &Request,
        ) -> Result<Option<SecurityContext>, AuthError> {
            Ok(None)
        }
    }

    fn mechanism_spec(name: &'static str, precedence: Precedence) -> ComponentSpec {
        ComponentSpec {
            name,
            role: roles::AUTH_MECHANISM,
            precedence,
            scope: Scope::Singleton,
            unremovable: true,
        }
    }

    #[test]
    fn lone_fallback_mechanism_is_active() {
        let mut registry = ComponentRegistry::new();
        registry.register_mechanism(
            mechanism_spec("BasicAuthMechanism", Precedence::Fallback),
            Arc::new(Named("basic")),
        );

        let active = registry.active_mechanisms();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].scheme(), "basic");
    }

    #[test]
    fn explicit_mechanism_supersedes_fallback() {
        let mut registry = ComponentRegistry::new();
        registry.register_mechanism(
            mechanism_spec("BasicAuthMechanism", Precedence::Fallback),
            Arc::new(Named("basic")),
        );
        registry.register_mechanism(
            mechanism_spec("FormAuthMechanism", Precedence::Explicit),
            Arc::new(Named("form")),
        );

        let schemes: Vec<_> = registry
            .active_mechanisms()
            .iter()
            .map(|m| m.scheme())
            .collect();
        assert_eq!(schemes, vec!["form"]);
    }

    #[test]
    fn explicit_mechanisms_coexist() {
        let mut registry = ComponentRegistry::new();
        registry.register_mechanism(
            mechanism_spec("FormAuthMechanism", Precedence::Explicit),
            Arc::new(Named("form")),
        );
        registry.register_mechanism(
            mechanism_spec("MtlsAuthMechanism", Precedence::Explicit),
            Arc::new(Named("x509")),
        );

        assert_eq!(registry.active_mechanisms().len(), 2);
    }

    #[test]
    fn two_explicit_components_on_a_single_slot_role_conflict() {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentSpec {
            name: "RoutePolicyMatcher",
            role: roles::ROUTE_POLICY,
            precedence: Precedence::Explicit,
            scope: Scope::Application,
            unremovable: true,
        });
        registry.register(ComponentSpec {
            name: "OtherPolicyMatcher",
            role: roles::ROUTE_POLICY,
            precedence: Precedence::Explicit,
            scope: Scope::Application,
            unremovable: true,
        });

        let err = registry.resolve_unique(roles::ROUTE_POLICY).unwrap_err();
        assert!(matches!(err, AssemblyError::AmbiguousComponent { .. }));
    }

    #[test]
    fn explicit_beats_fallback_in_unique_resolution() {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentSpec {
            name: "FallbackExecutor",
            role: roles::BLOCKING_EXECUTOR,
            precedence: Precedence::Fallback,
            scope: Scope::Application,
            unremovable: false,
        });
        registry.register(ComponentSpec {
            name: "ConfiguredExecutor",
            role: roles::BLOCKING_EXECUTOR,
            precedence: Precedence::Explicit,
            scope: Scope::Application,
            unremovable: false,
        });

        let resolved = registry
            .resolve_unique(roles::BLOCKING_EXECUTOR)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.name, "ConfiguredExecutor");
    }

    #[test]
    fn reachability_roots_keep_only_unremovable_components() {
        let mut registry = ComponentRegistry::new();
        registry.register_mechanism(
            mechanism_spec("FormAuthMechanism", Precedence::Explicit),
            Arc::new(Named("form")),
        );
        registry.register(ComponentSpec {
            name: "BasicAuthMechanism",
            role: roles::AUTH_MECHANISM,
            precedence: Precedence::Fallback,
            scope: Scope::Singleton,
            unremovable: false,
        });

        assert_eq!(registry.reachability_roots(), vec!["FormAuthMechanism"]);
    }
}
