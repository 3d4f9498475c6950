//! Directory Query Layer
//!
//! Two searches are issued, one after the other, over a single session:
//!
//! 1. [`find_principals_with_resultant_pso`] - subtree search under the default
//!    naming context for users and PSO-linked groups.
//! 2. [`find_all_psos`] - subtree search of the Password Settings Container.
//!
//! Both enumerate every page in arrival order. Nothing is retried here.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info, instrument, warn};

use crate::error::{DirectoryResult, QueryFailure};
use crate::model::{
    attr, PrincipalKind, PrincipalRef, PsoReference, PASSWORD_SETTINGS_CLASS,
    PASSWORD_SETTINGS_CONTAINER,
};
use crate::operation::{DirectoryEntry, Filter, PageCookie, SearchRequest};
use crate::traits::DirectorySession;

/// Operation name reported by a failed principals search.
pub const FIND_PRINCIPALS: &str = "find_principals_with_resultant_pso";

/// Operation name reported by a failed PSO container search.
pub const FIND_ALL_PSOS: &str = "find_all_psos";

/// Attributes requested for principals.
pub const PRINCIPAL_ATTRIBUTES: &[&str] = &[
    attr::DISTINGUISHED_NAME,
    attr::OBJECT_CLASS,
    attr::SAM_ACCOUNT_NAME,
    attr::CN,
    attr::OBJECT_GUID,
    attr::RESULTANT_PSO,
    attr::PSO_APPLIED,
];

/// Attributes requested for PSO definitions.
pub const PSO_ATTRIBUTES: &[&str] = &[
    attr::NAME,
    attr::CN,
    attr::DESCRIPTION,
    attr::PRECEDENCE,
    attr::MIN_PASSWORD_LENGTH,
    attr::PASSWORD_HISTORY_LENGTH,
    attr::LOCKOUT_THRESHOLD,
    attr::LOCKOUT_OBSERVATION_WINDOW,
    attr::LOCKOUT_DURATION,
    attr::MIN_PASSWORD_AGE,
    attr::MAX_PASSWORD_AGE,
    attr::COMPLEXITY_ENABLED,
    attr::REVERSIBLE_ENCRYPTION_ENABLED,
    attr::PSO_APPLIES_TO,
];

/// Items collected by one search plus paging counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan<T> {
    /// Items in page arrival order.
    pub items: Vec<T>,
    /// Pages fetched.
    pub pages: usize,
    /// Entries returned by the server.
    pub entries: usize,
    /// Entries dropped (no PSO reference).
    pub skipped: usize,
}

impl<T> Default for Scan<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            entries: 0,
            skipped: 0,
        }
    }
}

/// DN of the Password Settings Container for a naming context.
pub fn password_settings_container(naming_context: &str) -> String {
    format!("{PASSWORD_SETTINGS_CONTAINER},{naming_context}")
}

/// Server-side filter for principals that may carry a PSO reference.
///
/// `msDS-ResultantPSO` is constructed and cannot be filtered on, so every
/// person-category user is returned and checked client-side. Groups carry
/// the stored `msDS-PSOApplied` back-link, which can be.
pub fn principal_filter() -> Filter {
    Filter::or(vec![
        Filter::and(vec![
            Filter::eq(attr::OBJECT_CATEGORY, "person"),
            Filter::eq(attr::OBJECT_CLASS, "user"),
        ]),
        Filter::and(vec![
            Filter::eq(attr::OBJECT_CLASS, "group"),
            Filter::present(attr::PSO_APPLIED),
        ]),
    ])
}

/// Filter for PSO definitions.
pub fn pso_filter() -> Filter {
    Filter::eq(attr::OBJECT_CLASS, PASSWORD_SETTINGS_CLASS)
}

/// Fetch every page of `request`, handing each page's entries to `sink`.
///
/// Returns the number of pages fetched.
async fn for_each_page<S, F>(session: &S, request: &SearchRequest, mut sink: F) -> DirectoryResult<usize>
where
    S: DirectorySession + ?Sized,
    F: FnMut(Vec<DirectoryEntry>),
{
    let mut cookie = PageCookie::initial();
    let mut pages = 0usize;

    loop {
        let page = session.search_page(request, cookie).await?;
        pages += 1;
        let has_more = page.has_more();
        debug!(
            base_dn = %request.base_dn,
            page = pages,
            entries = page.entries.len(),
            has_more,
            "Received search page"
        );
        sink(page.entries);

        match page.next {
            Some(next) if has_more => cookie = next,
            _ => break,
        }
    }

    Ok(pages)
}

/// Find users and groups governed by a PSO.
///
/// Users contribute their `msDS-ResultantPSO`. Groups contribute their
/// `msDS-PSOApplied` links: the first value is the reference, further values
/// are kept as competing links. Entries with neither are skipped.
#[instrument(skip(session), fields(base_dn = %session.default_naming_context()))]
pub async fn find_principals_with_resultant_pso<S>(
    session: &S,
    page_size: u32,
) -> Result<Scan<PsoReference>, QueryFailure>
where
    S: DirectorySession + ?Sized,
{
    let request = SearchRequest::subtree(
        session.default_naming_context(),
        principal_filter(),
        PRINCIPAL_ATTRIBUTES,
    )
    .with_page_size(page_size);

    debug!(filter = %request.filter, "Searching for PSO-bearing principals");

    let mut scan = Scan::default();
    let pages = for_each_page(session, &request, |entries| {
        for entry in entries {
            scan.entries += 1;
            match principal_reference(&entry) {
                Some(reference) => scan.items.push(reference),
                None => scan.skipped += 1,
            }
        }
    })
    .await
    .map_err(|e| QueryFailure::new(FIND_PRINCIPALS, e))?;
    scan.pages = pages;

    info!(
        pages = scan.pages,
        entries = scan.entries,
        references = scan.items.len(),
        skipped = scan.skipped,
        "Principal search completed"
    );
    Ok(scan)
}

/// Fetch every PSO definition in the Password Settings Container.
///
/// A missing container is not an error: the domain simply has no
/// fine-grained policies, and an empty scan is returned.
#[instrument(skip(session))]
pub async fn find_all_psos<S>(session: &S, page_size: u32) -> Result<Scan<DirectoryEntry>, QueryFailure>
where
    S: DirectorySession + ?Sized,
{
    let base_dn = password_settings_container(session.default_naming_context());
    let request = SearchRequest::subtree(base_dn, pso_filter(), PSO_ATTRIBUTES).with_page_size(page_size);

    let mut scan = Scan::default();
    let result = for_each_page(session, &request, |entries| {
        scan.entries += entries.len();
        scan.items.extend(entries);
    })
    .await;

    match result {
        Ok(pages) => scan.pages = pages,
        Err(e) if e.is_no_such_object() => {
            info!(base_dn = %request.base_dn, "Password Settings Container not found");
            return Ok(Scan::default());
        }
        Err(e) => {
            warn!(base_dn = %request.base_dn, error = %e, "PSO container search failed");
            return Err(QueryFailure::new(FIND_ALL_PSOS, e));
        }
    }

    info!(pages = scan.pages, psos = scan.items.len(), "PSO search completed");
    Ok(scan)
}

/// Build the principal snapshot and PSO reference for one entry.
pub fn principal_reference(entry: &DirectoryEntry) -> Option<PsoReference> {
    let kind = if entry.has_value(attr::OBJECT_CLASS, "group") {
        PrincipalKind::Group
    } else {
        PrincipalKind::User
    };

    let links: Vec<String> = match kind {
        PrincipalKind::User => entry
            .first(attr::RESULTANT_PSO)
            .map(|dn| vec![dn.to_string()])
            .unwrap_or_default(),
        PrincipalKind::Group => entry
            .values(attr::PSO_APPLIED)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
    };

    let mut links = links.into_iter().filter(|dn| !dn.trim().is_empty());
    let pso_dn = links.next()?;

    Some(PsoReference {
        principal: principal_from_entry(entry, kind),
        pso_dn,
        competing_pso_dns: links.collect(),
    })
}

fn principal_from_entry(entry: &DirectoryEntry, kind: PrincipalKind) -> PrincipalRef {
    let dn = if entry.dn.is_empty() {
        entry.first(attr::DISTINGUISHED_NAME).unwrap_or_default().to_string()
    } else {
        entry.dn.clone()
    };

    // objectClass is returned top-down, so the last value is the most specific
    let object_class = match kind {
        PrincipalKind::Group => "group".to_string(),
        PrincipalKind::User => entry
            .values(attr::OBJECT_CLASS)
            .and_then(<[String]>::last)
            .cloned()
            .unwrap_or_else(|| "user".to_string()),
    };

    PrincipalRef {
        dn,
        kind,
        object_class,
        sam_account_name: entry.first(attr::SAM_ACCOUNT_NAME).map(str::to_string),
        cn: entry.first(attr::CN).map(str::to_string),
        object_guid: entry.first_binary(attr::OBJECT_GUID).map(|b| STANDARD.encode(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_filter_text() {
        assert_eq!(
            principal_filter().to_ldap(),
            "(|(&(objectCategory=person)(objectClass=user))(&(objectClass=group)(msDS-PSOApplied=*)))"
        );
        assert_eq!(pso_filter().to_ldap(), "(objectClass=msDS-PasswordSettings)");
    }

    #[test]
    fn test_container_dn() {
        assert_eq!(
            password_settings_container("DC=corp,DC=local"),
            "CN=Password Settings Container,CN=System,DC=corp,DC=local"
        );
    }

    #[test]
    fn test_user_reference() {
        let entry = DirectoryEntry::new("CN=Alice,OU=Staff,DC=corp,DC=local")
            .with_values("objectClass", ["top", "person", "organizationalPerson", "user"])
            .with("sAMAccountName", "alice")
            .with_binary("objectGUID", vec![0xde, 0xad, 0xbe, 0xef])
            .with("msDS-ResultantPSO", "CN=Strict,CN=Password Settings Container,CN=System,DC=corp,DC=local");

        let reference = principal_reference(&entry).unwrap();
        assert_eq!(reference.principal.kind, PrincipalKind::User);
        assert_eq!(reference.principal.object_class, "user");
        assert_eq!(reference.principal.display_name(), "alice");
        assert_eq!(reference.principal.object_guid.as_deref(), Some("3q2+7w=="));
        assert!(reference.pso_dn.starts_with("CN=Strict"));
        assert!(reference.competing_pso_dns.is_empty());
    }

    #[test]
    fn test_user_without_resultant_pso_is_skipped() {
        let entry = DirectoryEntry::new("CN=Bob,DC=corp,DC=local")
            .with_values("objectClass", ["top", "person", "organizationalPerson", "user"]);
        assert!(principal_reference(&entry).is_none());
    }

    #[test]
    fn test_group_with_several_links() {
        let entry = DirectoryEntry::new("CN=Admins,DC=corp,DC=local")
            .with_values("objectClass", ["top", "group"])
            .with_values("msDS-PSOApplied", ["CN=A,CN=PSC", "CN=B,CN=PSC"]);

        let reference = principal_reference(&entry).unwrap();
        assert_eq!(reference.principal.kind, PrincipalKind::Group);
        assert_eq!(reference.pso_dn, "CN=A,CN=PSC");
        assert_eq!(reference.competing_pso_dns, vec!["CN=B,CN=PSC".to_string()]);
    }

    #[test]
    fn test_computer_keeps_its_class() {
        let entry = DirectoryEntry::new("CN=WS01,OU=Computers,DC=corp,DC=local")
            .with_values("objectClass", ["top", "person", "organizationalPerson", "user", "computer"])
            .with("msDS-ResultantPSO", "CN=A,CN=PSC");

        let reference = principal_reference(&entry).unwrap();
        assert_eq!(reference.principal.kind, PrincipalKind::User);
        assert_eq!(reference.principal.object_class, "computer");
    }

    #[test]
    fn test_dn_falls_back_to_attribute() {
        let entry = DirectoryEntry::new("")
            .with("distinguishedName", "CN=Carol,DC=corp,DC=local")
            .with("msDS-ResultantPSO", "CN=A,CN=PSC");
        assert_eq!(principal_reference(&entry).unwrap().principal.dn, "CN=Carol,DC=corp,DC=local");
    }
}
