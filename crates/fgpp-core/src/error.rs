//! Error taxonomy for policy discovery
//!
//! Three kinds of problem surface from a discovery run:
//! - [`QueryFailure`] - a directory search could not be executed or completed
//! - [`DecodeFailure`] - a PSO attribute holds a value that violates its encoding
//! - [`ResolutionWarning`] - a principal references a PSO that was not found
//!
//! Only `QueryFailure` is raised as an `Err`. The other two are accumulated on
//! the [`PolicyModel`](crate::aggregate::PolicyModel) so callers can render them.
//!
//! Transport-level problems reported by a [`DirectorySession`](crate::traits::DirectorySession)
//! use [`DirectoryError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// LDAP result code: strongerAuthRequired (DC refuses simple bind over plain LDAP).
pub const RC_STRONGER_AUTH_REQUIRED: u32 = 8;

/// LDAP result code: confidentialityRequired.
pub const RC_CONFIDENTIALITY_REQUIRED: u32 = 13;

/// LDAP result code: noSuchObject.
pub const RC_NO_SUCH_OBJECT: u32 = 32;

/// LDAP result code: invalidCredentials.
pub const RC_INVALID_CREDENTIALS: u32 = 49;

/// LDAP result code: insufficientAccessRights.
pub const RC_INSUFFICIENT_ACCESS: u32 = 50;

/// Error raised by a directory session while executing a search.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Failed to establish a connection to the directory server.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation did not complete within the configured timeout.
    #[error("operation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Bind was rejected (invalid credentials).
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// The bind identity may not read the requested entries.
    #[error("insufficient access rights for search under '{base_dn}'")]
    InsufficientAccess { base_dn: String },

    /// The search base does not exist.
    #[error("no such object: '{base_dn}'")]
    NoSuchObject { base_dn: String },

    /// The server answered with a non-success result code.
    #[error("LDAP error {code}: {message}")]
    Protocol { code: u32, message: String },

    /// The server answered with something the session could not interpret.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl DirectoryError {
    /// Create a connection failure without an underlying source.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failure wrapping an underlying error.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Map a non-zero LDAP result code to the closest variant.
    pub fn from_result_code(code: u32, message: impl Into<String>, base_dn: &str) -> Self {
        match code {
            RC_NO_SUCH_OBJECT => DirectoryError::NoSuchObject {
                base_dn: base_dn.to_string(),
            },
            RC_INVALID_CREDENTIALS => DirectoryError::AuthenticationFailed,
            RC_INSUFFICIENT_ACCESS => DirectoryError::InsufficientAccess {
                base_dn: base_dn.to_string(),
            },
            _ => DirectoryError::Protocol {
                code,
                message: message.into(),
            },
        }
    }

    /// Check if this error is transient.
    ///
    /// Nothing in this workspace retries; the classification is exposed so a
    /// caller wrapping the session can decide for itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. } | DirectoryError::Timeout { .. }
        )
    }

    /// Whether the server demands a protected channel for this operation.
    pub fn requires_tls(&self) -> bool {
        matches!(
            self,
            DirectoryError::Protocol {
                code: RC_STRONGER_AUTH_REQUIRED | RC_CONFIDENTIALITY_REQUIRED,
                ..
            }
        )
    }

    /// Whether the error means the search base is absent.
    pub fn is_no_such_object(&self) -> bool {
        matches!(self, DirectoryError::NoSuchObject { .. })
    }
}

/// Result type for directory session calls.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A directory search that could not be executed or did not complete.
#[derive(Debug, Error)]
#[error("query '{operation}' failed: {source}")]
pub struct QueryFailure {
    /// Name of the failed operation.
    pub operation: &'static str,
    /// Underlying transport error.
    #[source]
    pub source: DirectoryError,
}

impl QueryFailure {
    /// Wrap a directory error with the name of the failed operation.
    pub fn new(operation: &'static str, source: DirectoryError) -> Self {
        Self { operation, source }
    }

    /// Serializable summary kept on the model when the failure is recorded
    /// rather than raised.
    pub fn summary(&self) -> QueryFailureSummary {
        QueryFailureSummary {
            operation: self.operation.to_string(),
            message: self.source.to_string(),
        }
    }
}

/// Recorded form of a [`QueryFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailureSummary {
    pub operation: String,
    pub message: String,
}

/// What was wrong with a raw attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailureKind {
    /// Interval fields must be zero or negative.
    PositiveInterval,
    /// Boolean syntax accepts only TRUE or FALSE.
    InvalidBoolean,
    /// Value is not a decimal integer.
    InvalidInteger,
    /// Count fields must not be negative.
    NegativeCount,
    /// A single-valued attribute arrived with several values.
    MultipleValues,
}

impl std::fmt::Display for DecodeFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DecodeFailureKind::PositiveInterval => "interval must be zero or negative",
            DecodeFailureKind::InvalidBoolean => "expected TRUE or FALSE",
            DecodeFailureKind::InvalidInteger => "not a decimal integer",
            DecodeFailureKind::NegativeCount => "count must not be negative",
            DecodeFailureKind::MultipleValues => "single-valued attribute has several values",
        };
        f.write_str(text)
    }
}

/// A raw attribute value that violates its expected encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("cannot decode {attribute}='{raw}': {kind}")]
pub struct DecodeFailure {
    /// Attribute name (as requested from the directory).
    pub attribute: String,
    /// Offending raw value.
    pub raw: String,
    /// Classification of the problem.
    pub kind: DecodeFailureKind,
}

impl DecodeFailure {
    pub fn new(attribute: impl Into<String>, raw: impl Into<String>, kind: DecodeFailureKind) -> Self {
        Self {
            attribute: attribute.into(),
            raw: raw.into(),
            kind,
        }
    }
}

/// Why a principal's PSO reference could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    /// The container search succeeded but holds no PSO with that DN.
    DanglingReference,
    /// The container search failed, so nothing could be resolved.
    ContainerUnavailable,
}

/// A principal's resultant-PSO reference that matches no discovered PSO.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{principal_dn} references unknown PSO {pso_dn}")]
pub struct ResolutionWarning {
    pub principal_dn: String,
    pub pso_dn: String,
    pub reason: ResolutionReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_mapping() {
        let err = DirectoryError::from_result_code(32, "noSuchObject", "CN=X,DC=corp");
        assert!(err.is_no_such_object());
        assert!(err.to_string().contains("CN=X,DC=corp"));

        assert!(matches!(
            DirectoryError::from_result_code(49, "", ""),
            DirectoryError::AuthenticationFailed
        ));
        assert!(matches!(
            DirectoryError::from_result_code(50, "", "DC=corp"),
            DirectoryError::InsufficientAccess { .. }
        ));
        assert!(matches!(
            DirectoryError::from_result_code(53, "unwilling", ""),
            DirectoryError::Protocol { code: 53, .. }
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(DirectoryError::connection_failed("refused").is_transient());
        assert!(DirectoryError::Timeout { timeout_secs: 30 }.is_transient());
        assert!(!DirectoryError::AuthenticationFailed.is_transient());
        assert!(!DirectoryError::NoSuchObject {
            base_dn: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_requires_tls_classification() {
        assert!(DirectoryError::from_result_code(8, "strongerAuthRequired", "").requires_tls());
        assert!(DirectoryError::from_result_code(13, "confidentialityRequired", "").requires_tls());
        assert!(!DirectoryError::from_result_code(49, "", "").requires_tls());
        assert!(!DirectoryError::from_result_code(53, "unwilling", "").requires_tls());
    }

    #[test]
    fn test_query_failure_names_operation() {
        let failure = QueryFailure::new(
            "find_all_psos",
            DirectoryError::connection_failed("socket closed"),
        );
        let text = failure.to_string();
        assert!(text.contains("find_all_psos"));
        assert!(text.contains("socket closed"));

        let summary = failure.summary();
        assert_eq!(summary.operation, "find_all_psos");
    }

    #[test]
    fn test_decode_failure_display() {
        let failure = DecodeFailure::new(
            "msDS-LockoutDuration",
            "18000000000",
            DecodeFailureKind::PositiveInterval,
        );
        assert_eq!(
            failure.to_string(),
            "cannot decode msDS-LockoutDuration='18000000000': interval must be zero or negative"
        );
    }
}
