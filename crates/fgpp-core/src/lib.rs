//! # Fine-Grained Password Policy Discovery
//!
//! Finds which users and groups are governed by a Password Settings Object
//! (PSO) and decodes each PSO into readable password and lockout settings.
//!
//! The crate performs no network I/O. Callers hand it an already-bound
//! [`DirectorySession`] and get back a [`PolicyModel`].
//!
//! ## Example
//!
//! ```ignore
//! use fgpp_core::prelude::*;
//!
//! let model = discover(&session, &DiscoveryOptions::default()).await?;
//!
//! for policy in model.users_view(ViewOptions::default()) {
//!     println!("{}: {} users", policy.settings.name, policy.users.len());
//! }
//! for unresolved in &model.unresolved {
//!     eprintln!("{} -> {}", unresolved.principal.dn, unresolved.pso_dn);
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`decode`] - Attribute Decoder (interval ticks, boolean tokens, counts)
//! - [`query`] - Directory Query Layer (paged principal and PSO searches)
//! - [`aggregate`] - Aggregator and the [`PolicyModel`]
//! - [`discovery`] - Run orchestration
//! - [`model`] - Principals, PSOs and DN helpers
//! - [`operation`] - Entries, filters and search requests
//! - [`traits`] - The [`DirectorySession`] seam
//! - [`error`] - Error taxonomy

pub mod aggregate;
pub mod decode;
pub mod discovery;
pub mod error;
pub mod model;
pub mod operation;
pub mod query;
pub mod traits;

pub use aggregate::PolicyModel;
pub use traits::DirectorySession;

/// Prelude module for convenient imports.
pub mod prelude {
    // Errors
    pub use crate::error::{
        DecodeFailure, DecodeFailureKind, DirectoryError, DirectoryResult, QueryFailure,
        QueryFailureSummary, ResolutionReason, ResolutionWarning,
    };

    // Session seam
    pub use crate::traits::DirectorySession;

    // Operations
    pub use crate::operation::{
        default_page_size, DirectoryEntry, Filter, PageCookie, SearchPage, SearchRequest,
        SearchScope,
    };

    // Model
    pub use crate::model::{attr, PasswordSettings, PrincipalKind, PrincipalRef, PsoReference};

    // Decoder
    pub use crate::decode::{Decoded, Interval, PolicyDuration};

    // Aggregation and discovery
    pub use crate::aggregate::{
        build_model, AppliedPolicy, PolicyDecodeFailure, PolicyModel, UnresolvedReference,
        ViewOptions,
    };
    pub use crate::discovery::{discover, DiscoveryOptions, DiscoveryStats};
    pub use crate::query::{find_all_psos, find_principals_with_resultant_pso, Scan};
}

// Re-export async_trait for session implementors
pub use async_trait::async_trait;
