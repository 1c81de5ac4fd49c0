//! Error types for the Harvest library.

use thiserror::Error;

/// Main error type for Harvest operations.
///
/// Absence of a pattern match is not an error: extraction returns
/// `Ok(None)` and reconciliation terminates in `Outcome::NotFound`.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The subject has no counterpart record in the structured store.
    ///
    /// Distinct from a missing pattern match; batch callers route these
    /// subjects into a follow-up list instead of counting them as skipped.
    #[error("no structured record for subject '{subject}'")]
    NoStructuredRecord { subject: String },

    /// Multiple non-empty, mutually inconsistent candidates matched the
    /// key pattern and no disambiguation rule applies.
    #[error("ambiguous extraction for key '{key}': candidates {candidates:?}")]
    AmbiguousExtraction {
        key: String,
        candidates: Vec<String>,
    },

    /// The configured value kind is not recognized. Fatal to the one
    /// attribute, not to a batch.
    #[error("unsupported value kind: {0}")]
    UnsupportedValueKind(String),

    /// Transient collaborator failure (network, rate limit). Retryable.
    #[error("transient collaborator error: {0}")]
    Transient(String),

    /// Permanent collaborator failure (auth, permission, malformed claim).
    /// Not retryable.
    #[error("permanent collaborator error: {0}")]
    Permanent(String),

    /// Configuration error, discovered before the first subject is processed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Whether a caller may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HarvestError::Transient(_))
    }
}

/// Result type alias for Harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(HarvestError::Transient("rate limited".into()).is_retryable());
        assert!(!HarvestError::Permanent("bad token".into()).is_retryable());
        assert!(!HarvestError::Config("missing endpoint".into()).is_retryable());
    }

    #[test]
    fn test_display_includes_subject() {
        let err = HarvestError::NoStructuredRecord {
            subject: "Jubilee House".into(),
        };
        assert!(err.to_string().contains("Jubilee House"));
    }
}
