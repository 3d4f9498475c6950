//! Common test utilities for discovery tests.
//!
//! [`MockDirectory`] serves canned, multi-page search results keyed by search
//! base, so the engine can be exercised without a directory server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use fgpp_core::async_trait;
use fgpp_core::model::normalize_dn;
use fgpp_core::prelude::*;

pub const NAMING_CONTEXT: &str = "DC=corp,DC=local";
pub const CONTAINER: &str = "CN=Password Settings Container,CN=System,DC=corp,DC=local";

type ErrorFactory = Box<dyn Fn() -> DirectoryError + Send + Sync>;

enum Canned {
    Pages(Vec<Vec<DirectoryEntry>>),
    /// Serve `pages`, then fail on the next request.
    FailAfter(Vec<Vec<DirectoryEntry>>, ErrorFactory),
}

/// One recorded `search_page` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub base_dn: String,
    pub filter: String,
    pub page_size: u32,
    pub cookie: PageCookie,
}

/// In-memory directory session with canned paged results.
pub struct MockDirectory {
    naming_context: String,
    results: HashMap<String, Canned>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self {
            naming_context: NAMING_CONTEXT.to_string(),
            results: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Serve `pages` for searches rooted at `base_dn`.
    pub fn with_pages(mut self, base_dn: &str, pages: Vec<Vec<DirectoryEntry>>) -> Self {
        self.results.insert(normalize_dn(base_dn), Canned::Pages(pages));
        self
    }

    /// Serve principals from the naming context.
    pub fn with_principals(self, pages: Vec<Vec<DirectoryEntry>>) -> Self {
        self.with_pages(NAMING_CONTEXT, pages)
    }

    /// Serve PSOs from the Password Settings Container.
    pub fn with_psos(self, pages: Vec<Vec<DirectoryEntry>>) -> Self {
        self.with_pages(CONTAINER, pages)
    }

    /// Fail every search rooted at `base_dn`.
    pub fn failing(self, base_dn: &str, error: impl Fn() -> DirectoryError + Send + Sync + 'static) -> Self {
        self.failing_after(base_dn, Vec::new(), error)
    }

    /// Serve `pages` under `base_dn`, then fail.
    pub fn failing_after(
        mut self,
        base_dn: &str,
        pages: Vec<Vec<DirectoryEntry>>,
        error: impl Fn() -> DirectoryError + Send + Sync + 'static,
    ) -> Self {
        self.results
            .insert(normalize_dn(base_dn), Canned::FailAfter(pages, Box::new(error)));
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls received for one search base.
    pub fn calls_for(&self, base_dn: &str) -> Vec<RecordedCall> {
        let key = normalize_dn(base_dn);
        self.calls()
            .into_iter()
            .filter(|c| normalize_dn(&c.base_dn) == key)
            .collect()
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn cookie_for(index: usize) -> PageCookie {
    PageCookie(format!("page-{index}").into_bytes())
}

fn page_index(cookie: &PageCookie) -> Option<usize> {
    if cookie.is_empty() {
        return Some(0);
    }
    std::str::from_utf8(&cookie.0)
        .ok()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

#[async_trait]
impl DirectorySession for MockDirectory {
    fn default_naming_context(&self) -> &str {
        &self.naming_context
    }

    async fn search_page(&self, request: &SearchRequest, cookie: PageCookie) -> DirectoryResult<SearchPage> {
        self.calls.lock().unwrap().push(RecordedCall {
            base_dn: request.base_dn.clone(),
            filter: request.filter.to_ldap(),
            page_size: request.page_size,
            cookie: cookie.clone(),
        });

        let Some(canned) = self.results.get(&normalize_dn(&request.base_dn)) else {
            return Err(DirectoryError::NoSuchObject {
                base_dn: request.base_dn.clone(),
            });
        };

        let index = page_index(&cookie).ok_or_else(|| DirectoryError::InvalidResponse {
            message: "unknown paging cookie".to_string(),
        })?;

        let (pages, error) = match canned {
            Canned::Pages(pages) => (pages, None),
            Canned::FailAfter(pages, error) => (pages, Some(error)),
        };

        if index >= pages.len() {
            if let Some(error) = error {
                return Err(error());
            }
            if index == 0 {
                return Ok(SearchPage::last(Vec::new()));
            }
            return Err(DirectoryError::InvalidResponse {
                message: format!("page {index} requested past the end"),
            });
        }

        let entries = pages[index].clone();
        if index + 1 < pages.len() || error.is_some() {
            Ok(SearchPage::more(entries, cookie_for(index + 1)))
        } else {
            Ok(SearchPage::last(entries))
        }
    }
}

// Fixtures

pub fn pso_dn(name: &str) -> String {
    format!("CN={name},{CONTAINER}")
}

pub fn user_dn(name: &str) -> String {
    format!("CN={name},OU=Staff,{NAMING_CONTEXT}")
}

pub fn group_dn(name: &str) -> String {
    format!("CN={name},OU=Groups,{NAMING_CONTEXT}")
}

pub fn user(name: &str, resultant_pso: Option<&str>) -> DirectoryEntry {
    let entry = DirectoryEntry::new(user_dn(name))
        .with_values("objectClass", ["top", "person", "organizationalPerson", "user"])
        .with("sAMAccountName", name.to_lowercase())
        .with("cn", name);
    match resultant_pso {
        Some(pso) => entry.with("msDS-ResultantPSO", pso_dn(pso)),
        None => entry,
    }
}

pub fn group(name: &str, applied: &[&str]) -> DirectoryEntry {
    DirectoryEntry::new(group_dn(name))
        .with_values("objectClass", ["top", "group"])
        .with("sAMAccountName", name)
        .with_values("msDS-PSOApplied", applied.iter().map(|p| pso_dn(p)))
}

pub fn pso(name: &str, precedence: u32) -> DirectoryEntry {
    DirectoryEntry::new(pso_dn(name))
        .with("name", name)
        .with("msDS-PasswordSettingsPrecedence", precedence.to_string())
        .with("msDS-MinimumPasswordLength", "14")
        .with("msDS-PasswordHistoryLength", "24")
        .with("msDS-LockoutThreshold", "5")
        .with("msDS-LockoutDuration", "-18000000000")
        .with("msDS-LockoutObservationWindow", "-18000000000")
        .with("msDS-MinimumPasswordAge", "-864000000000")
        .with("msDS-MaximumPasswordAge", "-36288000000000")
        .with("msDS-PasswordComplexityEnabled", "TRUE")
        .with("msDS-PasswordReversibleEncryptionEnabled", "FALSE")
}
