use std::fmt;
use std::sync::Arc;

/// Identity of a secured method, as discovered by static analysis of declared
/// handlers.
///
/// Uniquely identifies one method per owning type; used as the lookup key of
/// the eager interceptor table. Cheap to clone and hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodId {
    owner: Arc<str>,
    name: Arc<str>,
}

impl MethodId {
    #[must_use]
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: Arc::from(owner),
            name: Arc::from(name),
        }
    }

    /// Fully qualified name of the type declaring the method.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Method name within the owning type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}
