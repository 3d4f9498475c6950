//! Integration tests for error mapping and exit codes

use fgpp_cli::CliError;
use fgpp_connector_ldap::LdapError;
use fgpp_core::error::{DirectoryError, QueryFailure};

#[test]
fn test_authentication_failure_exit_code() {
    let err = CliError::from(DirectoryError::AuthenticationFailed);
    assert!(matches!(err, CliError::AuthenticationFailed(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_insufficient_access_is_access_denied() {
    let err = CliError::from(DirectoryError::InsufficientAccess {
        base_dn: "DC=corp,DC=local".to_string(),
    });
    assert!(matches!(err, CliError::AccessDenied(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_connection_errors_are_network_class() {
    let err = CliError::from(DirectoryError::connection_failed("refused"));
    assert!(matches!(err, CliError::ConnectionFailed(_)));
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("Troubleshooting"));

    let err = CliError::from(DirectoryError::Timeout { timeout_secs: 30 });
    assert!(matches!(err, CliError::Network(_)));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_invalid_configuration_is_validation() {
    let err = CliError::from(LdapError::InvalidConfiguration {
        message: "host is required".to_string(),
    });
    assert!(matches!(err, CliError::Validation(ref m) if m == "host is required"));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_wrapped_directory_error_keeps_class() {
    let err = CliError::from(LdapError::from(DirectoryError::AuthenticationFailed));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_query_failure_names_operation() {
    let failure = QueryFailure::new(
        "find_principals_with_resultant_pso",
        DirectoryError::Protocol {
            code: 1,
            message: "operations error".to_string(),
        },
    );
    let err = CliError::from(failure);
    match &err {
        CliError::Query(message) => {
            assert!(message.starts_with("find_principals_with_resultant_pso: "));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_query_failure_with_access_error_maps_to_access_denied() {
    let failure = QueryFailure::new(
        "find_principals_with_resultant_pso",
        DirectoryError::InsufficientAccess {
            base_dn: "DC=corp,DC=local".to_string(),
        },
    );
    assert!(matches!(CliError::from(failure), CliError::AccessDenied(_)));
}

#[test]
fn test_tls_required_bind_points_at_ldaps() {
    let err = CliError::from(LdapError::from(DirectoryError::Protocol {
        code: 8,
        message: "bind rejected: 00002028: LdapErr: DSID-0C09026D, comment: The server requires binds to turn on integrity checking".to_string(),
    }));
    assert!(matches!(err, CliError::ConnectionFailed(_)));
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("--ldaps"));
}
