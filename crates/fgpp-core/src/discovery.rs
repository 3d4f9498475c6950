//! Run orchestration: query, decode, aggregate.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::aggregate::{build_model, PolicyModel};
use crate::error::QueryFailure;
use crate::operation::default_page_size;
use crate::query::{find_all_psos, find_principals_with_resultant_pso};
use crate::traits::DirectorySession;

/// Options for a discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// Page size requested for both searches.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// Counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    /// Pages fetched by the principals search.
    pub principal_pages: usize,
    /// Entries returned by the principals search.
    pub principal_entries: usize,
    /// Entries carrying a PSO reference.
    pub references: usize,
    /// Entries without a PSO reference.
    pub skipped: usize,
    /// References dropped because the principal was already seen.
    pub duplicate_principals: usize,
    /// Pages fetched by the PSO search.
    pub pso_pages: usize,
    /// PSO entries returned.
    pub pso_entries: usize,
}

/// Discover every fine-grained password policy and the principals it governs.
///
/// A failed principals search aborts the run. A failed PSO search does not:
/// it is recorded on the model and every reference ends up unresolved.
#[instrument(skip(session), fields(base_dn = %session.default_naming_context()))]
pub async fn discover<S>(session: &S, options: &DiscoveryOptions) -> Result<PolicyModel, QueryFailure>
where
    S: DirectorySession + ?Sized,
{
    let principals = find_principals_with_resultant_pso(session, options.page_size).await?;

    let (psos, container_failure) = match find_all_psos(session, options.page_size).await {
        Ok(scan) => (scan, None),
        Err(failure) => {
            warn!(error = %failure, "Continuing without PSO definitions");
            (Default::default(), Some(failure))
        }
    };

    let mut model = build_model(principals.items, &psos.items, container_failure.as_ref());
    model.stats = DiscoveryStats {
        principal_pages: principals.pages,
        principal_entries: principals.entries,
        references: principals.entries - principals.skipped,
        skipped: principals.skipped,
        duplicate_principals: model.stats.duplicate_principals,
        pso_pages: psos.pages,
        pso_entries: psos.entries,
    };

    info!(
        policies = model.policies.len(),
        resolved = model.resolved_count(),
        unresolved = model.unresolved.len(),
        decode_failures = model.decode_failures.len(),
        "Discovery completed"
    );
    Ok(model)
}
