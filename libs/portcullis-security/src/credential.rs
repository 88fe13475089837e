use secrecy::SecretString;

/// Credential envelope extracted from a request by an authentication
/// mechanism, before any verification has happened.
///
/// Secret material is wrapped in [`SecretString`] so `Debug` output redacts it
/// automatically. Verification is the identity resolver's job; holders of a
/// `Credential` must not treat it as proof of anything.
#[derive(Debug, Clone)]
pub enum Credential {
    /// `Authorization: Basic` username/password pair.
    Basic {
        username: String,
        password: SecretString,
    },
    /// Username/password pair posted to the form login route.
    Form {
        username: String,
        password: SecretString,
    },
    /// Opaque session credential previously issued after a form login.
    Session(SecretString),
    /// Peer identity asserted by the TLS layer during the client-certificate
    /// handshake.
    ClientCert { subject: String },
}

impl Credential {
    /// Scheme identifier of the mechanism this credential belongs to.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Form { .. } | Self::Session(_) => "form",
            Self::ClientCert { .. } => "x509",
        }
    }
}
