//! Main Harvester struct and public API.

use std::sync::Arc;

use tracing::info;

use crate::attribute::AttributeSpec;
use crate::batch::{BatchRunner, BatchSummary};
use crate::error::Result;
use crate::reconcile::{ReconciliationResult, Reconciler};
use crate::store::{StructuredStore, TextSource};

/// Configuration for harvesting runs. The edit summary lives on each
/// `AttributeSpec`; the reference here is recorded with every write.
#[derive(Debug, Clone, Default)]
pub struct HarvestConfig {
    /// Provenance reference recorded with every written claim, when set.
    pub reference: Option<String>,
}

impl HarvestConfig {
    /// Set the provenance reference.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// The harvesting engine: composes extraction, normalization and
/// reconciliation over explicit collaborators.
///
/// Collaborators are injected at construction; nothing reaches for
/// ambient global state.
pub struct Harvester {
    source: Arc<dyn TextSource>,
    store: Arc<dyn StructuredStore>,
    config: HarvestConfig,
}

impl Harvester {
    /// Create a harvester over the given collaborators with default
    /// configuration.
    pub fn new(source: Arc<dyn TextSource>, store: Arc<dyn StructuredStore>) -> Self {
        Self {
            source,
            store,
            config: HarvestConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: HarvestConfig) -> Self {
        self.config = config;
        self
    }

    /// Reconcile one (subject, attribute) pair.
    pub fn reconcile(
        &self,
        subject: &str,
        spec: &AttributeSpec,
    ) -> Result<ReconciliationResult> {
        Reconciler::new(self.source.as_ref(), self.store.as_ref()).reconcile(subject, spec)
    }

    /// Reconcile a batch of subjects, writing new candidates to the
    /// store.
    pub fn run_batch(&self, subjects: &[String], spec: &AttributeSpec) -> BatchSummary {
        BatchRunner::new(self.source.as_ref(), self.store.as_ref(), &self.config)
            .run(subjects, spec)
    }

    /// Query the source for a collection's members, then run the batch
    /// over them.
    pub fn run_collection(&self, collection: &str, spec: &AttributeSpec) -> Result<BatchSummary> {
        let subjects = self.source.collection(collection)?;
        info!(collection, subjects = subjects.len(), "collection loaded");
        Ok(self.run_batch(&subjects, spec))
    }
}
