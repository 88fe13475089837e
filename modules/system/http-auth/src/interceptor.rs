//! Eager per-method security interceptor table.
//!
//! When authentication is not proactive, a request may reach a secured
//! method without having been authenticated up front; the table maps each
//! secured method's identity to the check executed at its invocation point.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use portcullis_security::{AuthError, MethodId};

use crate::error::AssemblyError;

/// Check executed at the invocation point of a secured method, before the
/// method body runs. Operates on the request's extensions (where the
/// security context and the deferred-authentication handle live) and may
/// suspend while consulting the identity provider.
#[async_trait]
pub trait MethodGuard: Send + Sync {
    /// Run the check.
    ///
    /// # Errors
    ///
    /// An error aborts the method invocation.
    async fn apply(&self, extensions: &mut http::Extensions) -> Result<(), AuthError>;
}

/// A secured-method candidate discovered by static analysis of declared
/// handlers.
#[derive(Clone)]
pub struct InterceptorCandidate {
    pub method: MethodId,
    pub guard: Arc<dyn MethodGuard>,
}

impl InterceptorCandidate {
    #[must_use]
    pub fn new(method: MethodId, guard: Arc<dyn MethodGuard>) -> Self {
        Self { method, guard }
    }
}

/// Immutable method → guard mapping, built exactly once per assembly and
/// shared read-only with the serving runtime.
pub struct InterceptorTable {
    guards: HashMap<MethodId, Arc<dyn MethodGuard>>,
}

impl InterceptorTable {
    /// Guard for the given method, if the method is secured.
    #[must_use]
    pub fn guard_for(&self, method: &MethodId) -> Option<&Arc<dyn MethodGuard>> {
        self.guards.get(method)
    }

    #[must_use]
    pub fn is_secured(&self, method: &MethodId) -> bool {
        self.guards.contains_key(method)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodId> {
        self.guards.keys()
    }
}

/// Build the interceptor table.
///
/// Returns `None` when authentication is proactive, the security capability
/// is absent, or there are no candidates; eager interception is only
/// meaningful when authentication happens at the point of call.
///
/// # Errors
///
/// `DuplicateInterceptor` when two candidates target the same method: the
/// discovery step guarantees uniqueness, so a collision means the candidate
/// list is corrupt and silently dropping a check is not an option.
pub fn build_interceptor_table(
    candidates: Vec<InterceptorCandidate>,
    proactive: bool,
    security_capability: bool,
) -> Result<Option<Arc<InterceptorTable>>, AssemblyError> {
    if proactive || !security_capability || candidates.is_empty() {
        return Ok(None);
    }

    let mut guards = HashMap::with_capacity(candidates.len());
    for candidate in candidates {
        if guards
            .insert(candidate.method.clone(), candidate.guard)
            .is_some()
        {
            return Err(AssemblyError::DuplicateInterceptor {
                method: candidate.method,
            });
        }
    }

    tracing::debug!(count = guards.len(), "eager security interceptor table built");
    Ok(Some(Arc::new(InterceptorTable { guards })))
}
