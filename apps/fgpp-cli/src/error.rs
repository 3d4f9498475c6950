//! CLI error types and exit codes

use fgpp_connector_ldap::LdapError;
use fgpp_core::error::{DirectoryError, QueryFailure};
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Authentication failed or access denied
/// - 3: Network error
/// - 4: Validation error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection failed: {0}\n\nTroubleshooting:\n  - Check that the domain controller is reachable\n  - Try --dc with a specific controller\n  - Try --ldaps if plain LDAP is blocked")]
    ConnectionFailed(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Directory query failed: {0}")]
    Query(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::AuthenticationFailed(_) | CliError::AccessDenied(_) => 2,
            CliError::Network(_) | CliError::ConnectionFailed(_) => 3,
            CliError::Validation(_) => 4,
            CliError::Query(_) | CliError::Output(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self, use_color: bool) {
        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::AuthenticationFailed(_) => {
                Some("Check the username and password. Bare usernames are sent as DOMAIN\\user.")
            }
            CliError::AccessDenied(_) => {
                Some("Reading PSOs usually requires Domain Admins or delegated read access.")
            }
            _ => None,
        }
    }
}

impl From<DirectoryError> for CliError {
    fn from(e: DirectoryError) -> Self {
        let message = e.to_string();
        if e.requires_tls() {
            return CliError::ConnectionFailed(format!("{message} (the DC requires TLS)"));
        }
        match e {
            DirectoryError::AuthenticationFailed => CliError::AuthenticationFailed(message),
            DirectoryError::InsufficientAccess { .. } => CliError::AccessDenied(message),
            DirectoryError::ConnectionFailed { .. } => CliError::ConnectionFailed(message),
            DirectoryError::Timeout { .. } => CliError::Network(message),
            _ => CliError::Query(message),
        }
    }
}

impl From<LdapError> for CliError {
    fn from(e: LdapError) -> Self {
        match e {
            LdapError::InvalidConfiguration { message } => CliError::Validation(message),
            LdapError::Directory(inner) => inner.into(),
        }
    }
}

impl From<QueryFailure> for CliError {
    fn from(e: QueryFailure) -> Self {
        let operation = e.operation;
        match CliError::from(e.source) {
            CliError::Query(message) => CliError::Query(format!("{operation}: {message}")),
            other => other,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(format!("JSON error: {}", e))
    }
}

impl From<std::fmt::Error> for CliError {
    fn from(e: std::fmt::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Output(format!("I/O error: {}", e))
    }
}
