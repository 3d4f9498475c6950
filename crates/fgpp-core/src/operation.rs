//! Directory operation types
//!
//! Types exchanged with a [`DirectorySession`](crate::traits::DirectorySession):
//! entries, filters, search requests, and paged results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw directory entry as returned by a search.
///
/// Attribute names are matched case-insensitively, as LDAP does. Values are
/// kept exactly as the server sent them; decoding happens in [`crate::decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,

    /// Textual attributes keyed by lowercased name.
    #[serde(default)]
    attrs: HashMap<String, Vec<String>>,

    /// Binary attributes (e.g. objectGUID) keyed by lowercased name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
            bin_attrs: HashMap::new(),
        }
    }

    /// Append values to a textual attribute.
    pub fn add_values<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Append values to a binary attribute.
    pub fn add_binary_values<I>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        self.bin_attrs
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(values);
    }

    /// Builder form of [`add_values`](Self::add_values) for a single value.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.add_values(name, [value.into()]);
        self
    }

    /// Builder form of [`add_values`](Self::add_values).
    #[must_use]
    pub fn with_values<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_values(name, values);
        self
    }

    /// Builder form of [`add_binary_values`](Self::add_binary_values) for a single value.
    #[must_use]
    pub fn with_binary(mut self, name: &str, value: Vec<u8>) -> Self {
        self.add_binary_values(name, [value]);
        self
    }

    /// All values of a textual attribute, or `None` when absent.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attrs
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
    }

    /// First value of a textual attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// First value of a binary attribute.
    pub fn first_binary(&self, name: &str) -> Option<&[u8]> {
        self.bin_attrs
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(Vec::as_slice)
    }

    /// Whether a multi-valued attribute contains `value` (ASCII case-insensitive).
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.values(name)
            .is_some_and(|vals| vals.iter().any(|v| v.eq_ignore_ascii_case(value)))
    }
}

/// Search filter, rendered to RFC 4515 text by [`Filter::to_ldap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// All sub-filters must match.
    And { filters: Vec<Filter> },
    /// At least one sub-filter must match.
    Or { filters: Vec<Filter> },
    /// Attribute equals value.
    Equals { attribute: String, value: String },
    /// Attribute has at least one value.
    Present { attribute: String },
}

impl Filter {
    /// Create an equality filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a presence filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create an OR filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Render as an LDAP filter string.
    pub fn to_ldap(&self) -> String {
        match self {
            Filter::And { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap).collect();
                format!("(&{})", inner.join(""))
            }
            Filter::Or { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap).collect();
                format!("(|{})", inner.join(""))
            }
            Filter::Equals { attribute, value } => {
                format!("({}={})", attribute, escape_filter_value(value))
            }
            Filter::Present { attribute } => format!("({attribute}=*)"),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_ldap())
    }
}

/// Escape special characters in LDAP filter values (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry.
    Base,
    /// Immediate children of the base.
    OneLevel,
    /// The base and everything below it.
    Subtree,
}

/// A search to run against the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search base DN.
    pub base_dn: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Search filter.
    pub filter: Filter,
    /// Attributes to return.
    pub attributes: Vec<String>,
    /// Requested page size for simple paged results.
    pub page_size: u32,
}

impl SearchRequest {
    /// Create a subtree search.
    pub fn subtree(base_dn: impl Into<String>, filter: Filter, attributes: &[&str]) -> Self {
        Self {
            base_dn: base_dn.into(),
            scope: SearchScope::Subtree,
            filter,
            attributes: attributes.iter().map(|a| (*a).to_string()).collect(),
            page_size: default_page_size(),
        }
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Default page size for paged searches.
pub fn default_page_size() -> u32 {
    1000
}

/// Opaque paging cookie returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCookie(pub Vec<u8>);

impl PageCookie {
    /// Cookie used to request the first page.
    pub fn initial() -> Self {
        Self(Vec::new())
    }

    /// Whether this is the empty cookie.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Entries in server arrival order.
    pub entries: Vec<DirectoryEntry>,
    /// Cookie for the next page; `None` when the result set is exhausted.
    pub next: Option<PageCookie>,
}

impl SearchPage {
    /// A final page.
    pub fn last(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            next: None,
        }
    }

    /// A page followed by more results.
    pub fn more(entries: Vec<DirectoryEntry>, next: PageCookie) -> Self {
        Self {
            entries,
            next: Some(next),
        }
    }

    /// Whether the server signalled more pages.
    pub fn has_more(&self) -> bool {
        self.next.as_ref().is_some_and(|c| !c.is_empty())
    }
}
