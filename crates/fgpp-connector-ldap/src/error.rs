//! Connector errors.

use fgpp_core::error::DirectoryError;
use thiserror::Error;

/// Errors raised while configuring or opening an LDAP session.
#[derive(Debug, Error)]
pub enum LdapError {
    /// The configuration is incomplete or contradictory.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The directory rejected or failed an operation.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl LdapError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LdapError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Whether the bind credentials were rejected.
    pub fn is_authentication(&self) -> bool {
        matches!(self, LdapError::Directory(DirectoryError::AuthenticationFailed))
    }

    /// Whether the server could not be reached or timed out.
    pub fn is_transient(&self) -> bool {
        matches!(self, LdapError::Directory(e) if e.is_transient())
    }

    /// Whether a failed plain-LDAP attempt should be repeated over LDAPS.
    ///
    /// Covers an unreachable server and a DC that rejects simple bind without
    /// TLS. Rejected credentials never qualify.
    pub fn should_fall_back_to_ldaps(&self) -> bool {
        match self {
            LdapError::Directory(e) => e.is_transient() || e.requires_tls(),
            LdapError::InvalidConfiguration { .. } => false,
        }
    }
}

/// Result type for connector operations.
pub type LdapResult<T> = Result<T, LdapError>;
