//! LDAP session implementation
//!
//! Implements [`DirectorySession`] over `ldap3` with RFC 2696 simple paged
//! results.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::controls::{Control, ControlType, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use fgpp_core::error::{DirectoryError, DirectoryResult};
use fgpp_core::operation::{DirectoryEntry, PageCookie, SearchPage, SearchRequest, SearchScope};
use fgpp_core::traits::DirectorySession;

use crate::config::LdapConfig;
use crate::error::{LdapError, LdapResult};

/// rootDSE attribute holding the domain's naming context.
const DEFAULT_NAMING_CONTEXT: &str = "defaultNamingContext";

/// rootDSE attribute holding the DC's DNS name.
const DNS_HOST_NAME: &str = "dnsHostName";

/// An authenticated LDAP session.
pub struct LdapSession {
    /// Bound connection handle.
    ldap: Ldap,

    /// Search base for the domain.
    naming_context: String,

    /// DNS name reported by the domain controller.
    dns_host_name: Option<String>,

    /// URL actually connected to.
    url: String,

    /// Per-request timeout.
    operation_timeout: Duration,
}

impl LdapSession {
    /// Connect, bind, and read the rootDSE.
    ///
    /// Plain LDAP is tried first. If the connection cannot be opened, or the
    /// DC refuses a simple bind without TLS, and the config allows it, a
    /// single LDAPS attempt on 636 follows. Credential errors never trigger
    /// the fallback.
    #[instrument(skip(config), fields(host = %config.host))]
    pub async fn connect(config: &LdapConfig) -> LdapResult<Self> {
        config.validate()?;

        match Self::open(config).await {
            Ok(session) => Ok(session),
            Err(e) if e.should_fall_back_to_ldaps() => match config.ldaps_fallback_config() {
                Some(fallback) => {
                    warn!(url = %config.url(), error = %e, fallback = %fallback.url(), "Plain LDAP failed, retrying over LDAPS");
                    Self::open(&fallback).await
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn open(config: &LdapConfig) -> LdapResult<Self> {
        let url = config.url();
        let operation_timeout = Duration::from_secs(config.connection.operation_timeout_secs);

        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.connection.connection_timeout_secs))
            .set_starttls(config.use_starttls)
            .set_no_tls_verify(!config.verify_certificate);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        // Spawn the connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &config.bind_dn;
        let bind_password = config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .with_timeout(operation_timeout)
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| map_ldap_error(e, "LDAP bind failed", operation_timeout))?;

        if result.rc != 0 {
            return Err(match result.rc {
                fgpp_core::error::RC_INVALID_CREDENTIALS => DirectoryError::AuthenticationFailed,
                rc => DirectoryError::Protocol {
                    code: rc,
                    message: format!("bind rejected: {}", result.text),
                },
            }
            .into());
        }

        let (root_naming_context, dns_host_name) = read_root_dse(&mut ldap, operation_timeout).await?;

        let naming_context = if config.base_dn.trim().is_empty() {
            root_naming_context.ok_or_else(|| {
                LdapError::from(DirectoryError::InvalidResponse {
                    message: "rootDSE has no defaultNamingContext".to_string(),
                })
            })?
        } else {
            config.base_dn.clone()
        };

        info!(
            url = %url,
            naming_context = %naming_context,
            dns_host_name = dns_host_name.as_deref().unwrap_or("-"),
            "LDAP session established"
        );

        Ok(Self {
            ldap,
            naming_context,
            dns_host_name,
            url,
            operation_timeout,
        })
    }

    /// DNS name the domain controller reported, if any.
    pub fn dns_host_name(&self) -> Option<&str> {
        self.dns_host_name.as_deref()
    }

    /// URL of the established connection.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Unbind and close the connection.
    pub async fn close(mut self) -> LdapResult<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| map_ldap_error(e, "LDAP unbind failed", self.operation_timeout))?;
        debug!(url = %self.url, "LDAP session closed");
        Ok(())
    }

    /// Convert our scope to the ldap3 scope.
    fn scope(scope: SearchScope) -> Scope {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }

    /// Convert an LDAP search entry to a directory entry.
    fn entry_to_directory_entry(entry: SearchEntry) -> DirectoryEntry {
        let mut converted = DirectoryEntry::new(entry.dn);
        for (name, values) in entry.attrs {
            converted.add_values(&name, values);
        }
        for (name, values) in entry.bin_attrs {
            converted.add_binary_values(&name, values);
        }
        converted
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    fn default_naming_context(&self) -> &str {
        &self.naming_context
    }

    #[instrument(skip(self, request, cookie), fields(base_dn = %request.base_dn, page_size = request.page_size))]
    async fn search_page(&self, request: &SearchRequest, cookie: PageCookie) -> DirectoryResult<SearchPage> {
        let mut ldap = self.ldap.clone();
        let filter = request.filter.to_ldap();
        let attrs: Vec<&str> = request.attributes.iter().map(String::as_str).collect();

        debug!(filter = %filter, continued = !cookie.is_empty(), "Searching LDAP");

        let control = PagedResults {
            size: i32::try_from(request.page_size).unwrap_or(i32::MAX),
            cookie: cookie.0,
        };

        let result = ldap
            .with_controls(control)
            .with_timeout(self.operation_timeout)
            .search(&request.base_dn, Self::scope(request.scope), &filter, attrs)
            .await
            .map_err(|e| map_ldap_error(e, "LDAP search failed", self.operation_timeout))?;

        let ldap3::SearchResult(entries, status) = result;
        if status.rc != 0 {
            return Err(DirectoryError::from_result_code(status.rc, status.text, &request.base_dn));
        }

        let entries: Vec<DirectoryEntry> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(Self::entry_to_directory_entry)
            .collect();

        let next = next_cookie(&status.ctrls);
        debug!(entries = entries.len(), has_more = next.is_some(), "LDAP page received");

        Ok(SearchPage { entries, next })
    }
}

impl std::fmt::Debug for LdapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSession")
            .field("url", &self.url)
            .field("naming_context", &self.naming_context)
            .field("dns_host_name", &self.dns_host_name)
            .finish_non_exhaustive()
    }
}

/// Read `defaultNamingContext` and `dnsHostName` from the rootDSE.
async fn read_root_dse(ldap: &mut Ldap, timeout: Duration) -> LdapResult<(Option<String>, Option<String>)> {
    let result = ldap
        .with_timeout(timeout)
        .search("", Scope::Base, "(objectClass=*)", vec![DEFAULT_NAMING_CONTEXT, DNS_HOST_NAME])
        .await
        .map_err(|e| map_ldap_error(e, "rootDSE read failed", timeout))?;

    let (entries, _) = result
        .success()
        .map_err(|e| map_ldap_error(e, "rootDSE read failed", timeout))?;

    let Some(entry) = entries.into_iter().next() else {
        return Ok((None, None));
    };
    let root = LdapSession::entry_to_directory_entry(SearchEntry::construct(entry));

    Ok((
        root.first(DEFAULT_NAMING_CONTEXT).map(str::to_string),
        root.first(DNS_HOST_NAME).map(str::to_string),
    ))
}

/// Cookie for the next page, or `None` when the server has no more results.
fn next_cookie(ctrls: &[Control]) -> Option<PageCookie> {
    ctrls.iter().find_map(|Control(ctype, raw)| {
        if !matches!(ctype, Some(ControlType::PagedResults)) || raw.val.is_none() {
            return None;
        }
        let paged = raw.parse::<PagedResults>();
        (!paged.cookie.is_empty()).then(|| PageCookie(paged.cookie))
    })
}

/// Map an ldap3 error to a directory error.
fn map_ldap_error(error: ldap3::LdapError, context: &str, timeout: Duration) -> DirectoryError {
    match error {
        ldap3::LdapError::Timeout { .. } => DirectoryError::Timeout {
            timeout_secs: timeout.as_secs(),
        },
        ldap3::LdapError::LdapResult { result } => {
            DirectoryError::from_result_code(result.rc, result.text, &result.matched)
        }
        other => DirectoryError::connection_failed_with_source(context, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldap3::controls::RawControl;
    use std::collections::HashMap;

    #[test]
    fn test_scope_mapping() {
        assert!(matches!(LdapSession::scope(SearchScope::Base), Scope::Base));
        assert!(matches!(LdapSession::scope(SearchScope::OneLevel), Scope::OneLevel));
        assert!(matches!(LdapSession::scope(SearchScope::Subtree), Scope::Subtree));
    }

    #[test]
    fn test_entry_conversion_keeps_text_and_binary() {
        let mut attrs = HashMap::new();
        attrs.insert("sAMAccountName".to_string(), vec!["alice".to_string()]);
        attrs.insert(
            "objectClass".to_string(),
            vec!["top".to_string(), "person".to_string(), "user".to_string()],
        );
        let mut bin_attrs = HashMap::new();
        bin_attrs.insert("objectGUID".to_string(), vec![vec![1u8, 2, 3, 4]]);

        let entry = SearchEntry {
            dn: "CN=Alice,DC=corp,DC=local".to_string(),
            attrs,
            bin_attrs,
        };
        let converted = LdapSession::entry_to_directory_entry(entry);

        assert_eq!(converted.dn, "CN=Alice,DC=corp,DC=local");
        assert_eq!(converted.first("samaccountname"), Some("alice"));
        assert!(converted.has_value("objectClass", "user"));
        assert_eq!(converted.first_binary("objectGUID"), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn test_next_cookie_from_paged_control() {
        let raw: RawControl = PagedResults {
            size: 0,
            cookie: b"opaque".to_vec(),
        }
        .into();
        let ctrls = vec![Control(Some(ControlType::PagedResults), raw)];
        assert_eq!(next_cookie(&ctrls), Some(PageCookie(b"opaque".to_vec())));
    }

    #[test]
    fn test_next_cookie_empty_means_done() {
        let raw: RawControl = PagedResults {
            size: 0,
            cookie: Vec::new(),
        }
        .into();
        let ctrls = vec![Control(Some(ControlType::PagedResults), raw)];
        assert_eq!(next_cookie(&ctrls), None);
        assert_eq!(next_cookie(&[]), None);
    }

    #[test]
    fn test_map_timeout_and_result_codes() {
        let err = map_ldap_error(
            ldap3::LdapError::LdapResult {
                result: ldap3::LdapResult {
                    rc: 32,
                    matched: "DC=corp,DC=local".to_string(),
                    text: "no such object".to_string(),
                    refs: Vec::new(),
                    ctrls: Vec::new(),
                },
            },
            "search",
            Duration::from_secs(5),
        );
        assert!(err.is_no_such_object());
    }
}
