//! Command-line arguments

use clap::Parser;
use fgpp_connector_ldap::config::MAX_PAGE_SIZE;
use fgpp_connector_ldap::ActiveDirectoryConfig;

use crate::error::{CliError, CliResult};
use crate::logging::LogLevel;

/// Report fine-grained password policies (PSOs) and the users and groups they govern
#[derive(Debug, Parser)]
#[command(name = "fgpp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// AD domain name (e.g. corp.local)
    #[arg(short, long, env = "FGPP_DOMAIN")]
    pub domain: String,

    /// Username; a bare name is sent as DOMAIN\user
    #[arg(short, long, env = "FGPP_USERNAME")]
    pub username: String,

    /// Password
    #[arg(short, long, env = "FGPP_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Domain controller to connect to (defaults to the domain name)
    #[arg(long, env = "FGPP_DC")]
    pub dc: Option<String>,

    /// Search base (defaults to the rootDSE defaultNamingContext)
    #[arg(long)]
    pub base_dn: Option<String>,

    /// Connect with LDAPS on 636
    #[arg(long, conflicts_with = "starttls")]
    pub ldaps: bool,

    /// Upgrade the plain connection with STARTTLS
    #[arg(long)]
    pub starttls: bool,

    /// Do not retry over LDAPS when plain LDAP is unreachable
    #[arg(long)]
    pub no_ldaps_fallback: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Page size for directory searches
    #[arg(long, default_value_t = 1000)]
    pub page_size: u32,

    /// Timeout in seconds for connecting and for each request
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Emit the whole policy model as JSON
    #[arg(long)]
    pub json: bool,

    /// List PSOs that govern nobody in the applied views too
    #[arg(long)]
    pub include_unapplied: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Increase diagnostic output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_verbosity(self.verbose)
    }

    /// Build the connection configuration from the arguments.
    pub fn to_config(&self) -> CliResult<ActiveDirectoryConfig> {
        if self.domain.trim().is_empty() {
            return Err(CliError::Validation("domain must not be empty".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(CliError::Validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.timeout == 0 {
            return Err(CliError::Validation("timeout must be at least 1 second".to_string()));
        }

        let mut config = ActiveDirectoryConfig::from_domain(&self.domain, &self.username, &self.password);
        if let Some(dc) = &self.dc {
            config = config.with_domain_controller(dc);
        }

        let ldap = &mut config.ldap;
        // the rootDSE supplies the naming context unless one is given
        ldap.base_dn = self.base_dn.clone().unwrap_or_default();
        ldap.page_size = self.page_size;
        ldap.connection.connection_timeout_secs = self.timeout;
        ldap.connection.operation_timeout_secs = self.timeout;
        ldap.verify_certificate = !self.insecure;
        ldap.ldaps_fallback = !self.no_ldaps_fallback;
        if self.ldaps {
            *ldap = ldap.clone().with_ssl();
        } else if self.starttls {
            *ldap = ldap.clone().with_starttls();
        }

        config.validate()?;
        Ok(config)
    }
}
