//! Authorization policy seam.

use async_trait::async_trait;

use crate::context::SecurityContext;

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The request may proceed.
    Permit,
    /// The request must be rejected.
    Deny,
}

/// A reusable authorization rule.
///
/// Named policies are declared at assembly time and applied by route-matching
/// logic outside this crate; the authorization filter applies the policy
/// matched for the current route. Implementations may suspend (e.g., while
/// consulting an external policy decision point) and must be safe to share
/// across request-handling threads.
#[async_trait]
pub trait SecurityPolicy: Send + Sync {
    /// Decide whether the given identity may proceed.
    async fn check(&self, ctx: &SecurityContext) -> PolicyDecision;
}
