//! Aggregator: groups principals by the PSO that governs them.
//!
//! Every reference handed to [`build_model`] lands in exactly one place:
//! the subject list of one discovered PSO, or the unresolved bucket.
//! Subject lists are append-only in the order the references arrived.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decode::decode_password_settings;
use crate::discovery::DiscoveryStats;
use crate::error::{DecodeFailure, QueryFailure, QueryFailureSummary, ResolutionReason, ResolutionWarning};
use crate::model::{normalize_dn, PasswordSettings, PrincipalKind, PrincipalRef, PsoReference};
use crate::operation::DirectoryEntry;

/// A PSO and the principals it governs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPolicy {
    /// Decoded PSO attributes.
    pub settings: PasswordSettings,
    /// Users governed by this PSO, in discovery order.
    pub users: Vec<PrincipalRef>,
    /// Groups governed by this PSO, in discovery order.
    pub groups: Vec<PrincipalRef>,
}

impl AppliedPolicy {
    fn new(settings: PasswordSettings) -> Self {
        Self {
            settings,
            users: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Number of governed principals.
    pub fn subject_count(&self) -> usize {
        self.users.len() + self.groups.len()
    }

    /// Whether at least one principal is governed by this PSO.
    pub fn is_applied(&self) -> bool {
        self.subject_count() > 0
    }

    fn push(&mut self, principal: PrincipalRef) {
        match principal.kind {
            PrincipalKind::User => self.users.push(principal),
            PrincipalKind::Group => self.groups.push(principal),
        }
    }
}

/// A principal whose PSO reference matched no discovered PSO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    pub principal: PrincipalRef,
    pub pso_dn: String,
    pub reason: ResolutionReason,
}

/// A decode failure attributed to the PSO it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecodeFailure {
    pub pso_dn: String,
    #[serde(flatten)]
    pub failure: DecodeFailure,
}

/// Which PSOs the applied views include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Also list PSOs that currently govern nobody.
    #[serde(default)]
    pub include_unapplied: bool,
}

/// Output of a discovery run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyModel {
    /// Every PSO found in the container, in arrival order.
    pub policies: Vec<AppliedPolicy>,
    /// Principals whose reference could not be resolved.
    pub unresolved: Vec<UnresolvedReference>,
    /// One warning per unresolved principal.
    pub warnings: Vec<ResolutionWarning>,
    /// Attribute values that failed to decode.
    pub decode_failures: Vec<PolicyDecodeFailure>,
    /// Set when the PSO container search failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_failure: Option<QueryFailureSummary>,
    /// Paging and skip counters.
    pub stats: DiscoveryStats,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PolicyModel {
    /// Look up a PSO by DN (case-insensitive).
    pub fn get(&self, pso_dn: &str) -> Option<&AppliedPolicy> {
        self.index.get(&normalize_dn(pso_dn)).map(|&i| &self.policies[i])
    }

    /// Full details view: every PSO in the container.
    pub fn details(&self) -> impl Iterator<Item = &AppliedPolicy> {
        self.policies.iter()
    }

    /// PSOs governing at least one principal.
    pub fn applied(&self, options: ViewOptions) -> impl Iterator<Item = &AppliedPolicy> {
        self.policies
            .iter()
            .filter(move |p| p.is_applied() || options.include_unapplied)
    }

    /// PSOs with at least one user subject.
    pub fn users_view(&self, options: ViewOptions) -> impl Iterator<Item = &AppliedPolicy> {
        self.policies
            .iter()
            .filter(move |p| !p.users.is_empty() || (options.include_unapplied && !p.is_applied()))
    }

    /// PSOs with at least one group subject.
    pub fn groups_view(&self, options: ViewOptions) -> impl Iterator<Item = &AppliedPolicy> {
        self.policies
            .iter()
            .filter(move |p| !p.groups.is_empty() || (options.include_unapplied && !p.is_applied()))
    }

    /// Principals placed under a PSO.
    pub fn resolved_count(&self) -> usize {
        self.policies.iter().map(AppliedPolicy::subject_count).sum()
    }

    /// Principals placed anywhere (resolved or unresolved).
    pub fn principal_count(&self) -> usize {
        self.resolved_count() + self.unresolved.len()
    }

    /// The container was read successfully but held nothing.
    ///
    /// An unprivileged bind sees the same thing, so renderers hint at that.
    pub fn container_is_empty(&self) -> bool {
        self.policies.is_empty() && self.container_failure.is_none()
    }

    fn insert_policy(&mut self, settings: PasswordSettings) -> bool {
        let key = settings.identity();
        if self.index.contains_key(&key) {
            return false;
        }
        for failure in settings.decode_failures() {
            self.decode_failures.push(PolicyDecodeFailure {
                pso_dn: settings.dn.clone(),
                failure: failure.clone(),
            });
        }
        self.index.insert(key, self.policies.len());
        self.policies.push(AppliedPolicy::new(settings));
        true
    }

    /// Pick the governing PSO among the resolvable candidates.
    ///
    /// Lowest precedence wins; ties and missing precedence keep the first
    /// candidate seen.
    fn select(&self, reference: &PsoReference) -> Option<usize> {
        std::iter::once(&reference.pso_dn)
            .chain(reference.competing_pso_dns.iter())
            .filter_map(|dn| self.index.get(&normalize_dn(dn)).copied())
            .min_by_key(|&i| {
                self.policies[i]
                    .settings
                    .precedence
                    .value()
                    .copied()
                    .unwrap_or(u32::MAX)
            })
    }
}

/// Build the policy model from principal references and raw PSO entries.
///
/// `container_failure` is the error of a failed PSO search. When set, no PSO
/// is known and every reference is unresolved with
/// [`ResolutionReason::ContainerUnavailable`].
pub fn build_model(
    references: Vec<PsoReference>,
    raw_psos: &[DirectoryEntry],
    container_failure: Option<&QueryFailure>,
) -> PolicyModel {
    let mut model = PolicyModel {
        container_failure: container_failure.map(QueryFailure::summary),
        ..PolicyModel::default()
    };

    for entry in raw_psos {
        let settings = decode_password_settings(entry);
        if !model.insert_policy(settings) {
            debug!(dn = %entry.dn, "Duplicate PSO entry ignored");
        }
    }

    let reason = if container_failure.is_some() {
        ResolutionReason::ContainerUnavailable
    } else {
        ResolutionReason::DanglingReference
    };

    let mut seen = HashSet::new();
    for reference in references {
        if !seen.insert(reference.principal.identity()) {
            debug!(dn = %reference.principal.dn, "Principal returned twice; keeping first");
            model.stats.duplicate_principals += 1;
            continue;
        }

        match model.select(&reference) {
            Some(i) => model.policies[i].push(reference.principal),
            None => {
                let warning = ResolutionWarning {
                    principal_dn: reference.principal.dn.clone(),
                    pso_dn: reference.pso_dn.clone(),
                    reason,
                };
                warn!(
                    principal = %warning.principal_dn,
                    pso = %warning.pso_dn,
                    ?reason,
                    "Unresolved PSO reference"
                );
                model.warnings.push(warning);
                model.unresolved.push(UnresolvedReference {
                    principal: reference.principal,
                    pso_dn: reference.pso_dn,
                    reason,
                });
            }
        }
    }

    model
}
