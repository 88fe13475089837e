use serde::{Deserialize, Serialize};

fn default_proactive() -> bool {
    true
}

fn default_post_location() -> String {
    "/auth/login".to_owned()
}

fn default_cookie_name() -> String {
    "portcullis-credential".to_owned()
}

fn default_landing() -> String {
    "/".to_owned()
}

fn default_realm() -> String {
    "portcullis".to_owned()
}

/// Build-time HTTP authentication settings.
///
/// An immutable snapshot created once before assembly starts; every decision
/// the assembly makes is derived from this struct and nothing else.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct HttpAuthConfig {
    /// If true, authentication is attempted for every incoming request before
    /// routing. If false, authentication is deferred until a secured method
    /// is actually invoked.
    pub proactive: bool,

    /// Basic authentication tri-state: absent = unset (eligible as the
    /// fallback mechanism), `true` = explicitly enabled, `false` = explicitly
    /// disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic: Option<bool>,

    /// Realm advertised in the basic authentication challenge.
    pub realm: String,

    /// Form-based authentication.
    pub form: FormAuthConfig,

    /// TLS client-certificate authentication mode, as configured on the
    /// listener.
    pub tls_client_auth: TlsClientAuth,

    /// Management-interface authentication.
    pub management: ManagementAuthConfig,
}

impl Default for HttpAuthConfig {
    fn default() -> Self {
        Self {
            proactive: default_proactive(),
            basic: None,
            realm: default_realm(),
            form: FormAuthConfig::default(),
            tls_client_auth: TlsClientAuth::default(),
            management: ManagementAuthConfig::default(),
        }
    }
}

impl HttpAuthConfig {
    /// Whether mutual TLS is enabled on the listener.
    #[must_use]
    pub fn mtls_enabled(&self) -> bool {
        self.tls_client_auth != TlsClientAuth::None
    }

    /// Whether basic authentication is enabled on the management interface.
    #[must_use]
    pub fn management_basic_enabled(&self) -> bool {
        self.management.basic.unwrap_or(false)
    }
}

/// Form-based authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct FormAuthConfig {
    pub enabled: bool,
    /// POST path handling login form submissions.
    pub post_location: String,
    /// Session cookie installed after a successful form login.
    pub cookie_name: String,
    /// Where to redirect after a successful login.
    pub landing: String,
}

impl Default for FormAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            post_location: default_post_location(),
            cookie_name: default_cookie_name(),
            landing: default_landing(),
        }
    }
}

/// TLS client-certificate authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsClientAuth {
    /// No client certificate requested.
    #[default]
    None,
    /// Certificate requested but optional.
    Request,
    /// Certificate required; handshake fails without one.
    Required,
}

/// Management-interface authentication settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ManagementAuthConfig {
    /// Basic authentication on the management interface; absent reads as
    /// disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic: Option<bool>,
}
