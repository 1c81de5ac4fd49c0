//! Collaborator interfaces: the text corpus and the structured store.
//!
//! The core only ever reads source text and records through these traits;
//! the one write operation is `StructuredStore::add_claim`. Implementations
//! must be thread-safe (`Send + Sync`) so callers may share them.

mod api;
mod mock;
mod reader;

pub use api::{ApiClient, ApiConfig};
pub use mock::{MockWiki, WriteFailure, WriteLogEntry};
pub use reader::read_attribute;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::attribute::AttributeId;
use crate::error::Result;
use crate::value::CanonicalValue;

static REDIRECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*#redirect\s*\[\[([^\]|#]+)").unwrap());

/// Fetched wikitext of one page, with a content fingerprint identifying
/// the revision examined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// Page title as fetched.
    pub title: String,
    /// Raw wikitext.
    pub text: String,
    /// SHA-256 hash of the wikitext.
    pub fingerprint: String,
    /// Destination title when the page is a redirect marker.
    pub redirect_target: Option<String>,
}

impl PageText {
    /// Wrap fetched wikitext, computing the fingerprint and detecting a
    /// redirect marker.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = format!("sha256:{:x}", Sha256::digest(text.as_bytes()));
        let redirect_target = REDIRECT
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());
        Self {
            title: title.into(),
            text,
            fingerprint,
            redirect_target,
        }
    }

    /// Whether the page is a redirect marker.
    pub fn is_redirect(&self) -> bool {
        self.redirect_target.is_some()
    }
}

/// Native typed value of one stored claim.
///
/// This closed union is decided once at the store boundary; downstream
/// code dispatches on `CanonicalValue` variants, never on claim internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimValue {
    /// Plain string (identifiers, URLs).
    Text { value: String },
    /// Quantity with an optional unit. The unit is informational only;
    /// comparisons are numeric.
    Quantity { amount: f64, unit: Option<String> },
    /// Geographic coordinate.
    Coordinate { lat: f64, lon: f64 },
    /// Point in time.
    Time { instant: DateTime<Utc> },
    /// Media file title.
    File { title: String },
    /// Link to another record by id.
    Item { id: String },
}

/// One stored (attribute, value) fact on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Attribute this claim belongs to.
    pub attribute: AttributeId,
    /// The typed value.
    pub value: ClaimValue,
    /// Provenance references recorded with the claim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl Claim {
    pub fn new(attribute: impl Into<AttributeId>, value: ClaimValue) -> Self {
        Self {
            attribute: attribute.into(),
            value,
            references: Vec::new(),
        }
    }

    /// Attach a provenance reference.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }
}

/// A record in the structured store: stable id, plain-language label and
/// claims grouped by attribute in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable record identifier (e.g. `Q4115189`).
    pub id: String,
    /// Plain-language label, when one exists.
    pub label: Option<String>,
    /// Claims keyed by attribute id.
    pub claims: IndexMap<String, Vec<Claim>>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            claims: IndexMap::new(),
        }
    }

    /// Set the plain-language label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a claim, preserving insertion order.
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims
            .entry(claim.attribute.as_str().to_string())
            .or_default()
            .push(claim);
        self
    }

    /// The first stored claim for an attribute, if any.
    pub fn first_claim(&self, attribute: &AttributeId) -> Option<&Claim> {
        self.claims.get(attribute.as_str()).and_then(|c| c.first())
    }
}

/// Provider of article wikitext.
pub trait TextSource: Send + Sync {
    /// Fetch the raw wikitext of a page. `Ok(None)` when the page does
    /// not exist.
    fn fetch_text(&self, title: &str) -> Result<Option<PageText>>;

    /// Resolve template transclusions in `text` as it would render on
    /// `title`.
    fn expand_templates(&self, title: &str, text: &str) -> Result<String>;

    /// Titles of the members of a named collection (category).
    fn collection(&self, name: &str) -> Result<Vec<String>>;
}

/// Reader/writer for the structured store.
pub trait StructuredStore: Send + Sync {
    /// The record linked to a subject title. `Ok(None)` when the subject
    /// has no structured counterpart.
    fn record_for(&self, title: &str) -> Result<Option<Record>>;

    /// Plain-language label of a record by id.
    fn label_of(&self, id: &str) -> Result<Option<String>>;

    /// Append one claim to a record. Failures are `Transient` (retryable
    /// by the caller) or `Permanent` (not retryable); callers do not
    /// retry within one batch pass.
    fn add_claim(
        &self,
        record_id: &str,
        attribute: &AttributeId,
        value: &CanonicalValue,
        summary: &str,
        reference: Option<&str>,
    ) -> Result<()>;
}
