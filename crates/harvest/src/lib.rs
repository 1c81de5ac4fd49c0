//! Harvest: wikitext fact harvesting and reconciliation for structured
//! knowledge bases.
//!
//! Harvest locates candidate values for named attributes in
//! semi-structured article text (infobox `key = value` fields or
//! free-form prose), canonicalizes them into typed values, and compares
//! them against the claims already recorded in a companion structured
//! store. Each pass produces one decision per (subject, attribute) pair:
//! the fact is new, already present, conflicting, or not found.
//!
//! # Core Principles
//!
//! - **Explicit collaborators**: source text and the structured store are
//!   reached through injected traits, never ambient global state
//! - **Typed canonical values**: claim kinds are decided once at the
//!   store boundary; cross-kind comparison is "not comparable", never a
//!   silent coercion
//! - **Surface, don't guess**: ambiguous extractions and conflicting
//!   values are reported for adjudication, not resolved by heuristic
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use harvest::{ApiClient, AttributeSpec, Harvester, SearchMode};
//!
//! let client = Arc::new(ApiClient::new().unwrap());
//! let harvester = Harvester::new(client.clone(), client);
//!
//! let spec = AttributeSpec::new("P127", "owners?", SearchMode::Infobox, "entity").unwrap();
//! let result = harvester.reconcile("Jubilee House", &spec).unwrap();
//!
//! println!("{}: {}", result.subject, result.outcome.label());
//! ```

pub mod attribute;
pub mod batch;
pub mod error;
pub mod extract;
pub mod reconcile;
pub mod store;
pub mod value;

mod harvest;

pub use attribute::{AttributeId, AttributeSpec};
pub use batch::{BatchRunner, BatchSummary, ErrorCounts};
pub use error::{HarvestError, Result};
pub use extract::{Extractor, KeyPattern, RawExtraction, SearchMode};
pub use crate::harvest::{HarvestConfig, Harvester};
pub use reconcile::{Outcome, ReconciliationResult, Reconciler};
pub use store::{
    read_attribute, ApiClient, ApiConfig, Claim, ClaimValue, MockWiki, PageText, Record,
    StructuredStore, TextSource, WriteFailure, WriteLogEntry,
};
pub use value::{clean_markup, normalize, CanonicalValue, CleanedText, ValueKind};
