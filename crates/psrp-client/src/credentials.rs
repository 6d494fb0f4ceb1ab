//! Credentials (§3): `(username, password, domain, realm, ccache-path,
//! keytab-path)`. Password, ccache and keytab contents are secrets and must
//! never appear in `Debug` output or logs (§4.H); this type's `Debug` impl
//! redacts them itself rather than relying solely on the log filter.

#[derive(Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub realm: Option<String>,
    pub ccache_path: Option<String>,
    pub keytab_path: Option<String>,
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    pub fn with_kerberos_cache(mut self, ccache_path: impl Into<String>) -> Self {
        self.ccache_path = Some(ccache_path.into());
        self
    }

    pub fn with_keytab(mut self, keytab_path: impl Into<String>) -> Self {
        self.keytab_path = Some(keytab_path.into());
        self
    }

    /// A structured, redacted representation safe to pass to a logger (§4.H).
    pub fn redacted(&self) -> RedactedCredentials<'_> {
        RedactedCredentials(self)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("domain", &self.domain)
            .field("realm", &self.realm)
            .field(
                "ccache_path",
                &self.ccache_path.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "keytab_path",
                &self.keytab_path.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

pub struct RedactedCredentials<'a>(&'a Credentials);

impl std::fmt::Display for RedactedCredentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Credentials {{ username: {:?}, domain: {:?}, realm: {:?}, password: [REDACTED] }}",
            self.0.username, self.0.domain, self.0.realm
        )
    }
}
