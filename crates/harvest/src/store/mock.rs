//! In-memory collaborators for testing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::attribute::AttributeId;
use crate::error::{HarvestError, Result};
use crate::value::CanonicalValue;

use super::{Claim, ClaimValue, PageText, Record, StructuredStore, TextSource};

/// Which error kind injected write failures produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    /// Rate limit / network style failure, retryable.
    Transient,
    /// Permission / malformed-claim style failure, not retryable.
    Permanent,
}

/// One recorded write, for assertions.
#[derive(Debug, Clone)]
pub struct WriteLogEntry {
    pub record_id: String,
    pub attribute: AttributeId,
    pub value: CanonicalValue,
    pub summary: String,
    pub reference: Option<String>,
}

#[derive(Default)]
struct Inner {
    pages: HashMap<String, String>,
    expansions: HashMap<String, String>,
    collections: HashMap<String, Vec<String>>,
    records: HashMap<String, Record>,
    sitelinks: HashMap<String, String>,
    labels: HashMap<String, String>,
    writes: Vec<WriteLogEntry>,
    fail_writes: Option<WriteFailure>,
}

/// In-memory implementation of both collaborator traits, with
/// builder-style seeding and a write log. Mutation goes through a mutex so
/// `add_claim` can take `&self` like the trait requires.
#[derive(Default)]
pub struct MockWiki {
    inner: Mutex<Inner>,
}

impl MockWiki {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an article with raw wikitext.
    pub fn with_page(self, title: impl Into<String>, text: impl Into<String>) -> Self {
        self.lock().pages.insert(title.into(), text.into());
        self
    }

    /// Seed a redirect from `title` to `target`.
    pub fn with_redirect(self, title: impl Into<String>, target: impl Into<String>) -> Self {
        let text = format!("#REDIRECT [[{}]]", target.into());
        self.with_page(title, text)
    }

    /// Seed the template-expanded form of an article.
    pub fn with_expanded(self, title: impl Into<String>, expanded: impl Into<String>) -> Self {
        self.lock().expansions.insert(title.into(), expanded.into());
        self
    }

    /// Seed a record and link it to the article with the same title.
    pub fn with_record(self, title: impl Into<String>, record: Record) -> Self {
        {
            let mut inner = self.lock();
            inner.sitelinks.insert(title.into(), record.id.clone());
            if let Some(label) = &record.label {
                inner.labels.insert(record.id.clone(), label.clone());
            }
            inner.records.insert(record.id.clone(), record);
        }
        self
    }

    /// Seed a label for a record id that has no full record.
    pub fn with_label(self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.lock().labels.insert(id.into(), label.into());
        self
    }

    /// Seed a collection (category) membership list.
    pub fn with_collection(
        self,
        name: impl Into<String>,
        titles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.lock()
            .collections
            .insert(name.into(), titles.into_iter().map(Into::into).collect());
        self
    }

    /// Make every subsequent write fail with the given kind.
    pub fn with_write_failure(self, failure: WriteFailure) -> Self {
        self.lock().fail_writes = Some(failure);
        self
    }

    /// All writes recorded so far.
    pub fn writes(&self) -> Vec<WriteLogEntry> {
        self.lock().writes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TextSource for MockWiki {
    fn fetch_text(&self, title: &str) -> Result<Option<PageText>> {
        Ok(self
            .lock()
            .pages
            .get(title)
            .map(|text| PageText::new(title, text.clone())))
    }

    fn expand_templates(&self, title: &str, text: &str) -> Result<String> {
        Ok(self
            .lock()
            .expansions
            .get(title)
            .cloned()
            .unwrap_or_else(|| text.to_string()))
    }

    fn collection(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.lock().collections.get(name).cloned().unwrap_or_default())
    }
}

impl StructuredStore for MockWiki {
    fn record_for(&self, title: &str) -> Result<Option<Record>> {
        let inner = self.lock();
        Ok(inner
            .sitelinks
            .get(title)
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    fn label_of(&self, id: &str) -> Result<Option<String>> {
        let inner = self.lock();
        Ok(inner
            .labels
            .get(id)
            .cloned()
            .or_else(|| inner.records.get(id).and_then(|r| r.label.clone())))
    }

    fn add_claim(
        &self,
        record_id: &str,
        attribute: &AttributeId,
        value: &CanonicalValue,
        summary: &str,
        reference: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.lock();

        match inner.fail_writes {
            Some(WriteFailure::Transient) => {
                return Err(HarvestError::Transient("rate limited".into()));
            }
            Some(WriteFailure::Permanent) => {
                return Err(HarvestError::Permanent("permission denied".into()));
            }
            None => {}
        }

        let claim_value = to_claim_value(&inner, value);
        let record = inner
            .records
            .get_mut(record_id)
            .ok_or_else(|| HarvestError::Permanent(format!("no record {}", record_id)))?;

        let mut claim = Claim::new(attribute.clone(), claim_value);
        if let Some(reference) = reference {
            claim = claim.with_reference(reference);
        }
        record
            .claims
            .entry(attribute.as_str().to_string())
            .or_default()
            .push(claim);

        inner.writes.push(WriteLogEntry {
            record_id: record_id.to_string(),
            attribute: attribute.clone(),
            value: value.clone(),
            summary: summary.to_string(),
            reference: reference.map(|r| r.to_string()),
        });
        Ok(())
    }
}

fn to_claim_value(inner: &Inner, value: &CanonicalValue) -> ClaimValue {
    match value {
        CanonicalValue::Text { value } => ClaimValue::Text {
            value: value.clone(),
        },
        CanonicalValue::Quantity { amount } => ClaimValue::Quantity {
            amount: *amount,
            unit: None,
        },
        CanonicalValue::Coordinate { lat, lon } => ClaimValue::Coordinate {
            lat: *lat,
            lon: *lon,
        },
        CanonicalValue::PointInTime { instant } => ClaimValue::Time { instant: *instant },
        CanonicalValue::FileRef { title } => ClaimValue::File {
            title: title.clone(),
        },
        CanonicalValue::EntityRef { label, id } => {
            let id = id.clone().or_else(|| {
                inner
                    .labels
                    .iter()
                    .find(|(_, l)| l.as_str() == label)
                    .map(|(id, _)| id.to_string())
            });
            ClaimValue::Item {
                id: id.unwrap_or_else(|| label.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_and_redirects() {
        let wiki = MockWiki::new()
            .with_page("Radcliffe Observatory", "| owner = [[Green Templeton College]]")
            .with_redirect("Sir William Chambers", "William Chambers (architect)");

        let page = wiki.fetch_text("Radcliffe Observatory").unwrap().unwrap();
        assert!(!page.is_redirect());

        let redirect = wiki.fetch_text("Sir William Chambers").unwrap().unwrap();
        assert_eq!(
            redirect.redirect_target.as_deref(),
            Some("William Chambers (architect)")
        );

        assert!(wiki.fetch_text("Missing page").unwrap().is_none());
    }

    #[test]
    fn test_expansion_defaults_to_identity() {
        let wiki = MockWiki::new().with_expanded("A", "expanded text");
        assert_eq!(wiki.expand_templates("A", "raw").unwrap(), "expanded text");
        assert_eq!(wiki.expand_templates("B", "raw").unwrap(), "raw");
    }

    #[test]
    fn test_write_is_recorded_and_visible_to_reads() {
        let wiki = MockWiki::new().with_record("Jubilee House", Record::new("Q1").with_label("Jubilee House"));

        wiki.add_claim(
            "Q1",
            &AttributeId::new("P127"),
            &CanonicalValue::Quantity { amount: 1.0 },
            "test edit",
            Some("imported from Wikimedia project"),
        )
        .unwrap();

        assert_eq!(wiki.writes().len(), 1);
        let record = wiki.record_for("Jubilee House").unwrap().unwrap();
        assert!(record.first_claim(&AttributeId::new("P127")).is_some());
        assert_eq!(
            record.first_claim(&AttributeId::new("P127")).unwrap().references,
            vec!["imported from Wikimedia project".to_string()]
        );
    }

    #[test]
    fn test_injected_write_failures() {
        let wiki = MockWiki::new()
            .with_record("A", Record::new("Q1"))
            .with_write_failure(WriteFailure::Transient);
        let err = wiki
            .add_claim(
                "Q1",
                &AttributeId::new("P1"),
                &CanonicalValue::text("x"),
                "s",
                None,
            )
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_entity_write_resolves_label_to_id() {
        let wiki = MockWiki::new()
            .with_record("A", Record::new("Q1"))
            .with_label("Q77", "Monrovia");

        wiki.add_claim(
            "Q1",
            &AttributeId::new("P931"),
            &CanonicalValue::entity("Monrovia"),
            "s",
            None,
        )
        .unwrap();

        let record = wiki.record_for("A").unwrap().unwrap();
        assert_eq!(
            record.first_claim(&AttributeId::new("P931")).unwrap().value,
            ClaimValue::Item { id: "Q77".into() }
        );
    }
}
