//! Assembly-time error taxonomy.

use portcullis_security::MethodId;
use thiserror::Error;

/// Errors surfaced while assembling the security pipeline.
///
/// Any of these aborts the whole assembly; a partial pipeline is never
/// published.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Two named security policies were declared under the same name.
    #[error("duplicate named security policy '{name}'")]
    DuplicatePolicyName { name: String },

    /// Two eager interceptor candidates target the same method; the
    /// discovery step is supposed to guarantee uniqueness.
    #[error("duplicate eager security interceptor for method '{method}'")]
    DuplicateInterceptor { method: MethodId },

    /// Two explicit components compete for a role that admits only one
    /// implementation.
    #[error("conflicting components for role '{role}': '{first}' and '{second}'")]
    AmbiguousComponent {
        role: &'static str,
        first: &'static str,
        second: &'static str,
    },
}
