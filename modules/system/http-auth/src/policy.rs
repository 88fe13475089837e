//! Named security policy registry.

use std::collections::HashMap;
use std::sync::Arc;

use portcullis_security::SecurityPolicy;

use crate::error::AssemblyError;

/// Deferred policy construction; invoked when a route first needs the policy.
pub type PolicySupplier = Arc<dyn Fn() -> Arc<dyn SecurityPolicy> + Send + Sync>;

/// An externally declared named security policy.
#[derive(Clone)]
pub struct NamedPolicyDecl {
    pub name: String,
    pub supplier: PolicySupplier,
}

impl NamedPolicyDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, supplier: PolicySupplier) -> Self {
        Self {
            name: name.into(),
            supplier,
        }
    }
}

/// Immutable name → policy-supplier mapping, published once per assembly and
/// consumed by the route-matching logic outside this crate.
#[derive(Default)]
pub struct NamedPolicies {
    suppliers: HashMap<String, PolicySupplier>,
}

impl NamedPolicies {
    /// Resolve a policy by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SecurityPolicy>> {
        self.suppliers.get(name).map(|supplier| supplier())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.suppliers.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.suppliers.keys().map(String::as_str)
    }
}

/// Aggregate policy declarations into a single mapping.
///
/// Publishes nothing for an empty declaration list; the router falls back to
/// other policy-selection means.
///
/// # Errors
///
/// `DuplicatePolicyName` when two declarations share a name; two policies
/// cannot share a name without ambiguity at route-matching time, so this is
/// rejected at assembly instead of silently overwritten.
pub fn collect_named_policies(
    declarations: Vec<NamedPolicyDecl>,
) -> Result<Option<NamedPolicies>, AssemblyError> {
    if declarations.is_empty() {
        return Ok(None);
    }

    let mut suppliers = HashMap::with_capacity(declarations.len());
    for declaration in declarations {
        if suppliers
            .insert(declaration.name.clone(), declaration.supplier)
            .is_some()
        {
            return Err(AssemblyError::DuplicatePolicyName {
                name: declaration.name,
            });
        }
    }

    tracing::info!(count = suppliers.len(), "named security policies collected");
    Ok(Some(NamedPolicies { suppliers }))
}
