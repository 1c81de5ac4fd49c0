//! Attribute configuration: which fact to look for and how.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::{KeyPattern, SearchMode};
use crate::value::ValueKind;

/// Opaque identifier of an attribute in the structured store (e.g. `P127`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(String);

impl AttributeId {
    pub fn new(id: impl Into<String>) -> Self {
        AttributeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AttributeId {
    fn from(s: &str) -> Self {
        AttributeId::new(s)
    }
}

impl From<String> for AttributeId {
    fn from(s: String) -> Self {
        AttributeId(s)
    }
}

/// Configuration binding a key pattern to a target attribute.
///
/// Mirrors the work tables driving a harvesting run: the key to search
/// for, the attribute it feeds, where the fact likely lives, what kind
/// of value to expect and the edit summary recorded with writes.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    /// Target attribute in the structured store.
    pub id: AttributeId,
    /// Case-insensitive key pattern (literal or alternation).
    pub key: KeyPattern,
    /// Likely location of the fact.
    pub mode: SearchMode,
    /// Expected value kind, used as the normalization hint.
    pub kind: ValueKind,
    /// Edit summary recorded with every claim written for this attribute.
    pub summary: String,
}

impl AttributeSpec {
    /// Build a spec, compiling the key pattern and parsing the value kind
    /// from its configuration string. Both fail before any subject is
    /// processed.
    pub fn new(
        id: impl Into<AttributeId>,
        key: &str,
        mode: SearchMode,
        kind: &str,
    ) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            key: KeyPattern::new(key)?,
            mode,
            kind: kind.parse()?,
            summary: "Adding claim harvested from article text".to_string(),
        })
    }

    /// Set the edit summary recorded with writes for this attribute.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}
