//! Batch reconciliation over a collection of subjects.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::attribute::AttributeSpec;
use crate::error::{HarvestError, Result};
use crate::harvest::HarvestConfig;
use crate::reconcile::{Outcome, ReconciliationResult, Reconciler};
use crate::store::{StructuredStore, TextSource};
use crate::value::CanonicalValue;

/// Error tallies per kind. Only the batch driver recovers from
/// per-subject errors, and it preserves the kind when it does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCounts {
    /// Ambiguous extractions surfaced rather than guessed.
    pub ambiguous: usize,
    /// Transient collaborator failures (retryable by a later run).
    pub transient: usize,
    /// Permanent collaborator failures.
    pub permanent: usize,
    /// Anything else.
    pub other: usize,
}

impl ErrorCounts {
    /// Total errors across all kinds.
    pub fn total(&self) -> usize {
        self.ambiguous + self.transient + self.permanent + self.other
    }

    fn record(&mut self, error: &HarvestError) {
        match error {
            HarvestError::AmbiguousExtraction { .. } => self.ambiguous += 1,
            HarvestError::Transient(_) => self.transient += 1,
            HarvestError::Permanent(_) => self.permanent += 1,
            _ => self.other += 1,
        }
    }
}

/// Aggregated outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Claims written to the store.
    pub added: usize,
    /// Facts the store already held.
    pub already_present: usize,
    /// Subjects where the key pattern was absent.
    pub not_found: usize,
    /// Conflicting results, carried whole for adjudication.
    pub conflicts: Vec<ReconciliationResult>,
    /// Subjects with no structured record, recorded for follow-up.
    pub no_record: Vec<String>,
    /// Error tallies per kind. Write failures are counted here and not
    /// retried within the pass.
    pub errors: ErrorCounts,
}

impl BatchSummary {
    /// Number of subjects that reached a terminal classification.
    pub fn processed(&self) -> usize {
        self.added
            + self.already_present
            + self.not_found
            + self.conflicts.len()
            + self.no_record.len()
            + self.errors.total()
    }
}

/// Iterates subjects, reconciles each and routes outcomes into the
/// summary buckets. One subject is fully processed before the next.
pub struct BatchRunner<'a> {
    source: &'a dyn TextSource,
    store: &'a dyn StructuredStore,
    config: &'a HarvestConfig,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        source: &'a dyn TextSource,
        store: &'a dyn StructuredStore,
        config: &'a HarvestConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Run the batch. Subjects are processed in the order supplied; the
    /// runner is the only component that recovers from per-subject
    /// errors. Running the same batch twice against an unmodified store
    /// adds nothing the second time.
    pub fn run(&self, subjects: &[String], spec: &AttributeSpec) -> BatchSummary {
        let reconciler = Reconciler::new(self.source, self.store);
        let mut summary = BatchSummary::default();

        for subject in subjects {
            match reconciler.reconcile(subject, spec) {
                Ok(result) => self.route(subject, result, spec, &mut summary),
                Err(HarvestError::NoStructuredRecord { .. }) => {
                    info!(subject, "no structured record, recorded for follow-up");
                    summary.no_record.push(subject.clone());
                }
                Err(error) => {
                    warn!(subject, %error, "reconciliation failed");
                    summary.errors.record(&error);
                }
            }
        }

        info!(
            added = summary.added,
            already_present = summary.already_present,
            conflicts = summary.conflicts.len(),
            not_found = summary.not_found,
            no_record = summary.no_record.len(),
            errors = summary.errors.total(),
            "batch finished"
        );
        summary
    }

    fn route(
        &self,
        subject: &str,
        result: ReconciliationResult,
        spec: &AttributeSpec,
        summary: &mut BatchSummary,
    ) {
        match result.outcome {
            Outcome::NotFound => {
                info!(subject, attribute = %result.attribute, "statement not found");
                summary.not_found += 1;
            }
            Outcome::AlreadyPresent => {
                info!(subject, attribute = %result.attribute, "repo already has the value");
                summary.already_present += 1;
            }
            Outcome::Conflict => {
                info!(subject, attribute = %result.attribute, "values conflict");
                summary.conflicts.push(result);
            }
            Outcome::NewCandidate => match &result.extracted {
                Some(value) => match self.write(subject, spec, value) {
                    Ok(()) => {
                        info!(subject, attribute = %result.attribute, %value, "claim added");
                        summary.added += 1;
                    }
                    Err(error) => {
                        warn!(subject, %error, "adding the claim failed");
                        summary.errors.record(&error);
                    }
                },
                None => summary.errors.record(&HarvestError::Permanent(
                    "new candidate without a value".to_string(),
                )),
            },
        }
    }

    fn write(&self, subject: &str, spec: &AttributeSpec, value: &CanonicalValue) -> Result<()> {
        let record = self
            .store
            .record_for(subject)?
            .ok_or_else(|| HarvestError::NoStructuredRecord {
                subject: subject.to_string(),
            })?;
        self.store.add_claim(
            &record.id,
            &spec.id,
            value,
            &spec.summary,
            self.config.reference.as_deref(),
        )
    }
}
