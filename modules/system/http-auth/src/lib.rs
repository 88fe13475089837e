#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Build-time assembly of the HTTP authentication/authorization pipeline.
//!
//! Everything here runs once, before the server starts serving traffic:
//! which mechanisms are installed (and whether basic authentication is the
//! explicit choice or merely the fallback), the ordered
//! authentication-before-authorization filter chain, the eager per-method
//! interceptor table used when authentication is not proactive, and the
//! named-policy registry consumed by route matching. Credential
//! verification stays behind the [`portcullis_security::IdentityResolver`]
//! seam; the HTTP router executing the filters is equally external.
//!
//! The entry point is [`assemble`]; the published [`SecurityAssembly`] is
//! immutable once returned.

pub mod assembly;
pub mod authenticate;
pub mod authorize;
pub mod config;
pub mod error;
pub mod filter;
pub mod form;
pub mod interceptor;
pub mod mechanism;
pub mod policy;
pub mod problem;
pub mod registry;

pub use assembly::{AssemblyEnv, SecurityAssembly, assemble};
pub use authenticate::{AuthnState, DeferredAuthentication, HttpAuthenticator};
pub use authorize::{AuthzState, HttpAuthorizer, RouteSecurityPolicy};
pub use config::{
    FormAuthConfig, HttpAuthConfig, ManagementAuthConfig, TlsClientAuth,
};
pub use error::AssemblyError;
pub use filter::{FilterEntry, FilterPriority, build_filters, install};
pub use form::{FormAuthMechanism, LoginRoute, login_route};
pub use interceptor::{
    InterceptorCandidate, InterceptorTable, MethodGuard, build_interceptor_table,
};
pub use mechanism::{
    AdvertisedScheme, AuthMechanism, BasicAuthMechanism, BasicInstallation, MtlsAuthMechanism,
    PeerIdentity, basic_auth_required, basic_installation,
};
pub use policy::{NamedPolicies, NamedPolicyDecl, PolicySupplier, collect_named_policies};
pub use registry::{ComponentRegistry, ComponentSpec, Precedence, Scope};
