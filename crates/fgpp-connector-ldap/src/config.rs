//! LDAP session configuration
//!
//! Configuration types for Active Directory connections.

use serde::{Deserialize, Serialize};

use crate::error::{LdapError, LdapResult};

/// Largest page size accepted for paged searches.
pub const MAX_PAGE_SIZE: u32 = 10_000;

/// Timeouts applied to the connection and to each operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Timeout for a single bind or search request, in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_operation_timeout() -> u64 {
    120
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

/// Configuration for an LDAP session.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Domain controller hostname or IP address.
    pub host: String,

    /// LDAP server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Verify the server certificate on TLS connections.
    #[serde(default = "default_true")]
    pub verify_certificate: bool,

    /// Retry once over LDAPS on 636 when the plain connection cannot be opened.
    #[serde(default = "default_true")]
    pub ldaps_fallback: bool,

    /// Base DN (e.g. "DC=corp,DC=local"). Empty means: read it from the rootDSE.
    #[serde(default)]
    pub base_dn: String,

    /// Bind identity: a DN, a UPN, or `DOMAIN\user`.
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Timeouts.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Page size for search operations.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("verify_certificate", &self.verify_certificate)
            .field("ldaps_fallback", &self.ldaps_fallback)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection", &self.connection)
            .field("page_size", &self.page_size)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_ldaps_port() -> u16 {
    636
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    fgpp_core::operation::default_page_size()
}

impl LdapConfig {
    /// Create a new LDAP config with required fields.
    pub fn new(host: impl Into<String>, base_dn: impl Into<String>, bind_dn: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            verify_certificate: true,
            ldaps_fallback: true,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            connection: ConnectionSettings::default(),
            page_size: default_page_size(),
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.use_starttls = false;
        self.port = default_ldaps_port();
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_starttls = true;
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// The LDAPS variant of this config, used by the fallback path.
    ///
    /// `None` when this config is already LDAPS or fallback is disabled.
    #[must_use]
    pub fn ldaps_fallback_config(&self) -> Option<Self> {
        if self.use_ssl || !self.ldaps_fallback {
            return None;
        }
        Some(self.clone().with_ssl())
    }

    /// Check the configuration for missing or contradictory settings.
    pub fn validate(&self) -> LdapResult<()> {
        if self.host.trim().is_empty() {
            return Err(LdapError::invalid("host is required"));
        }

        if self.bind_dn.trim().is_empty() {
            return Err(LdapError::invalid("bind identity is required"));
        }

        if self.use_ssl && self.use_starttls {
            return Err(LdapError::invalid("cannot use both SSL and STARTTLS"));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(LdapError::invalid(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        if self.connection.connection_timeout_secs == 0 || self.connection.operation_timeout_secs == 0 {
            return Err(LdapError::invalid("timeouts must be at least one second"));
        }

        Ok(())
    }
}

/// Configuration for an Active Directory domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveDirectoryConfig {
    /// Base LDAP configuration.
    #[serde(flatten)]
    pub ldap: LdapConfig,

    /// AD domain name (e.g., "corp.local").
    pub domain: String,
}

impl ActiveDirectoryConfig {
    /// Create an AD config from a DNS domain name.
    ///
    /// The domain doubles as the host (AD publishes its DCs under the domain
    /// name), `base_dn` is derived from it, and a bare username becomes the
    /// down-level `DOMAIN\user` bind identity.
    #[must_use]
    pub fn from_domain(domain: &str, username: &str, password: &str) -> Self {
        Self {
            ldap: LdapConfig::new(domain, domain_to_base_dn(domain), bind_identity(domain, username))
                .with_password(password),
            domain: domain.to_string(),
        }
    }

    /// Connect to a specific domain controller instead of the domain name.
    #[must_use]
    pub fn with_domain_controller(mut self, host: impl Into<String>) -> Self {
        self.ldap.host = host.into();
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> LdapResult<()> {
        if self.domain.trim().is_empty() {
            return Err(LdapError::invalid("domain is required"));
        }
        self.ldap.validate()
    }
}

/// Convert `corp.local` to `DC=corp,DC=local`.
pub fn domain_to_base_dn(domain: &str) -> String {
    domain
        .trim()
        .trim_end_matches('.')
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| format!("DC={part}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Bind identity for `username` in `domain`.
///
/// DNs, UPNs and already-qualified `DOMAIN\user` names pass through.
pub fn bind_identity(domain: &str, username: &str) -> String {
    if username.contains('\\') || username.contains('@') || username.contains('=') {
        username.to_string()
    } else {
        format!("{domain}\\{username}")
    }
}
