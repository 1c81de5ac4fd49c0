//! Reconciling extracted facts against the structured store.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attribute::{AttributeId, AttributeSpec};
use crate::error::{HarvestError, Result};
use crate::extract::{Extractor, SearchMode};
use crate::store::{read_attribute, PageText, StructuredStore, TextSource};
use crate::value::{clean_markup, normalize, CanonicalValue, ValueKind};

/// Terminal outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The key pattern is absent from the source. Expected, not an error.
    NotFound,
    /// The store already holds an equal value for the attribute.
    AlreadyPresent,
    /// The store has no value yet; the extracted value is a candidate for
    /// addition.
    NewCandidate,
    /// The store holds a different (or not comparable) value. Both values
    /// are carried for a human or a higher-level policy to adjudicate.
    Conflict,
}

impl Outcome {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::NotFound => "not found",
            Outcome::AlreadyPresent => "already present",
            Outcome::NewCandidate => "new candidate",
            Outcome::Conflict => "conflict",
        }
    }

    /// Whether this outcome queues a write.
    pub fn is_new_candidate(&self) -> bool {
        matches!(self, Outcome::NewCandidate)
    }
}

/// The decision record for one (subject, attribute) pair. Immutable once
/// produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Subject (article title).
    pub subject: String,
    /// Target attribute in the structured store.
    pub attribute: AttributeId,
    /// Normalized extracted value, when extraction succeeded.
    pub extracted: Option<CanonicalValue>,
    /// Currently stored value, when one exists.
    pub repo_value: Option<CanonicalValue>,
    /// Terminal outcome.
    pub outcome: Outcome,
}

impl ReconciliationResult {
    fn not_found(subject: &str, attribute: &AttributeId) -> Self {
        Self {
            subject: subject.to_string(),
            attribute: attribute.clone(),
            extracted: None,
            repo_value: None,
            outcome: Outcome::NotFound,
        }
    }
}

/// Orchestrates extraction, normalization and repo lookup into one
/// decision per (subject, attribute) pair.
pub struct Reconciler<'a> {
    source: &'a dyn TextSource,
    store: &'a dyn StructuredStore,
    extractor: Extractor,
}

impl<'a> Reconciler<'a> {
    pub fn new(source: &'a dyn TextSource, store: &'a dyn StructuredStore) -> Self {
        Self {
            source,
            store,
            extractor: Extractor::new(),
        }
    }

    /// Run one reconciliation pass.
    ///
    /// A subject whose article does not exist reconciles to `NotFound`
    /// (nothing extractable); a subject whose structured record is
    /// missing fails with `NoStructuredRecord` so batch callers can route
    /// it for follow-up.
    pub fn reconcile(&self, subject: &str, spec: &AttributeSpec) -> Result<ReconciliationResult> {
        let page = match self.source.fetch_text(subject)? {
            Some(page) => page,
            None => return Ok(ReconciliationResult::not_found(subject, &spec.id)),
        };

        let text = match spec.mode {
            SearchMode::Infobox => page.text,
            SearchMode::FreeText => match self.expanded_text(page)? {
                Some(text) => text,
                None => return Ok(ReconciliationResult::not_found(subject, &spec.id)),
            },
        };

        let raw = match self.extractor.extract(subject, &text, &spec.key, spec.mode)? {
            Some(raw) => raw,
            None => return Ok(ReconciliationResult::not_found(subject, &spec.id)),
        };
        debug!(subject, key = spec.key.literal(), raw = %raw.text, "extracted");

        let extracted = match spec.kind {
            ValueKind::EntityRef => self.resolve_entity(&raw.text)?,
            kind => normalize(&raw.text, kind),
        };

        let record = self
            .store
            .record_for(subject)?
            .ok_or_else(|| HarvestError::NoStructuredRecord {
                subject: subject.to_string(),
            })?;
        let repo_value = read_attribute(&record, &spec.id, self.store)?;

        let outcome = match &repo_value {
            None => Outcome::NewCandidate,
            Some(repo) => match extracted.compare(repo) {
                Some(true) => Outcome::AlreadyPresent,
                // Unequal, or not comparable across kinds: both values are
                // surfaced unchanged for adjudication.
                Some(false) | None => Outcome::Conflict,
            },
        };

        Ok(ReconciliationResult {
            subject: subject.to_string(),
            attribute: spec.id.clone(),
            extracted: Some(extracted),
            repo_value,
            outcome,
        })
    }

    /// Free-text searches run over the redirect destination's expanded
    /// text. `None` when the redirect points at a missing page.
    fn expanded_text(&self, page: PageText) -> Result<Option<String>> {
        let page = match &page.redirect_target {
            Some(target) => match self.source.fetch_text(target)? {
                Some(target_page) => target_page,
                None => return Ok(None),
            },
            None => page,
        };
        Ok(Some(self.source.expand_templates(&page.title, &page.text)?))
    }

    /// Canonicalize an entity-valued capture.
    ///
    /// Explicit two-step: resolve the link target's redirect, then check
    /// the target exists. An existing target with a structured record
    /// canonicalizes to that record's label; anything else falls back to
    /// the cleaned display text, which stays comparable.
    fn resolve_entity(&self, raw: &str) -> Result<CanonicalValue> {
        let cleaned = clean_markup(raw);

        if let Some(page) = self.source.fetch_text(&cleaned.target)? {
            let target_title = match &page.redirect_target {
                Some(target) => {
                    if self.source.fetch_text(target)?.is_none() {
                        return Ok(CanonicalValue::entity(cleaned.display));
                    }
                    target.clone()
                }
                None => page.title,
            };
            if let Some(record) = self.store.record_for(&target_title)? {
                let label = record.label.clone().unwrap_or_else(|| record.id.clone());
                return Ok(CanonicalValue::entity_with_id(label, record.id));
            }
        }

        Ok(CanonicalValue::entity(cleaned.display))
    }
}
