//! # LDAP Session
//!
//! Active Directory transport for fine-grained password policy discovery.
//!
//! Opens an authenticated `ldap3` connection and exposes it as a
//! [`DirectorySession`](fgpp_core::DirectorySession) so the discovery engine
//! can run its paged searches.
//!
//! ## Features
//!
//! - Simple bind as a DN, a UPN, or `DOMAIN\user`
//! - LDAPS and STARTTLS, with LDAPS fallback when plain LDAP is unreachable
//! - Base DN from configuration or the rootDSE `defaultNamingContext`
//! - RFC 2696 simple paged results
//!
//! ## Example
//!
//! ```ignore
//! use fgpp_connector_ldap::{ActiveDirectoryConfig, LdapSession};
//! use fgpp_core::prelude::*;
//!
//! let config = ActiveDirectoryConfig::from_domain("corp.local", "auditor", "secret");
//! let session = LdapSession::connect(&config.ldap).await?;
//! let model = discover(&session, &DiscoveryOptions::default()).await?;
//! ```

pub mod config;
pub mod connector;
pub mod error;

// Re-exports
pub use config::{ActiveDirectoryConfig, ConnectionSettings, LdapConfig};
pub use connector::LdapSession;
pub use error::{LdapError, LdapResult};
