//! Canonical value representation and variant-aware comparison.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// Expected value kind for an attribute, supplied by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Plain string value (identifiers, URLs, free text).
    Text,
    /// Numeric quantity.
    Quantity,
    /// Geographic coordinate pair.
    Coordinate,
    /// Point in time.
    PointInTime,
    /// Media file reference.
    FileRef,
    /// Reference to another record in the structured store.
    EntityRef,
}

impl FromStr for ValueKind {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "string" | "url" => Ok(ValueKind::Text),
            "quantity" | "number" | "amount" => Ok(ValueKind::Quantity),
            "coordinate" | "coord" => Ok(ValueKind::Coordinate),
            "time" | "date" | "point_in_time" => Ok(ValueKind::PointInTime),
            "file" | "image" | "media" => Ok(ValueKind::FileRef),
            "entity" | "item" => Ok(ValueKind::EntityRef),
            other => Err(HarvestError::UnsupportedValueKind(other.to_string())),
        }
    }
}

/// A normalized, typed fact value usable for equality comparison.
///
/// Exactly one variant is populated. Comparisons are only valid between
/// same-variant values; cross-variant comparison is "not comparable" and
/// never silently coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalValue {
    /// Plain text.
    Text { value: String },
    /// Numeric quantity. Unit strings are dropped at the store-reading
    /// boundary; equality is numeric.
    Quantity { amount: f64 },
    /// Geographic coordinate (latitude, longitude).
    Coordinate { lat: f64, lon: f64 },
    /// A single instant. Bare years normalize to the first instant of
    /// the year.
    PointInTime { instant: DateTime<Utc> },
    /// Media file name with the canonical `File:` prefix.
    FileRef { title: String },
    /// Another record, canonicalized to its plain-language label so
    /// comparisons against prose work. When the label resolved to a
    /// record, `id` carries its structured identifier for the write path;
    /// a label with no structured counterpart yet has no id.
    EntityRef {
        label: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        id: Option<String>,
    },
}

impl CanonicalValue {
    /// Convenience constructor for text values.
    pub fn text(value: impl Into<String>) -> Self {
        CanonicalValue::Text {
            value: value.into(),
        }
    }

    /// Convenience constructor for an entity reference that has not been
    /// resolved to a record.
    pub fn entity(label: impl Into<String>) -> Self {
        CanonicalValue::EntityRef {
            label: label.into(),
            id: None,
        }
    }

    /// Convenience constructor for an entity reference resolved to a
    /// record in the structured store.
    pub fn entity_with_id(label: impl Into<String>, id: impl Into<String>) -> Self {
        CanonicalValue::EntityRef {
            label: label.into(),
            id: Some(id.into()),
        }
    }

    /// The kind this value belongs to.
    pub fn kind(&self) -> ValueKind {
        match self {
            CanonicalValue::Text { .. } => ValueKind::Text,
            CanonicalValue::Quantity { .. } => ValueKind::Quantity,
            CanonicalValue::Coordinate { .. } => ValueKind::Coordinate,
            CanonicalValue::PointInTime { .. } => ValueKind::PointInTime,
            CanonicalValue::FileRef { .. } => ValueKind::FileRef,
            CanonicalValue::EntityRef { .. } => ValueKind::EntityRef,
        }
    }

    /// Variant-aware equality.
    ///
    /// Returns `Some(true)`/`Some(false)` for same-variant values and
    /// `None` when the variants differ (not comparable).
    pub fn compare(&self, other: &CanonicalValue) -> Option<bool> {
        match (self, other) {
            (CanonicalValue::Text { value: a }, CanonicalValue::Text { value: b }) => {
                Some(a == b)
            }
            (CanonicalValue::Quantity { amount: a }, CanonicalValue::Quantity { amount: b }) => {
                Some(a == b)
            }
            (
                CanonicalValue::Coordinate { lat: a1, lon: a2 },
                CanonicalValue::Coordinate { lat: b1, lon: b2 },
            ) => Some(a1 == b1 && a2 == b2),
            (
                CanonicalValue::PointInTime { instant: a },
                CanonicalValue::PointInTime { instant: b },
            ) => Some(a == b),
            (CanonicalValue::FileRef { title: a }, CanonicalValue::FileRef { title: b }) => {
                Some(a == b)
            }
            (
                CanonicalValue::EntityRef { label: a, .. },
                CanonicalValue::EntityRef { label: b, .. },
            ) => Some(a == b),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::Text { value } => write!(f, "{}", value),
            CanonicalValue::Quantity { amount } => write!(f, "{}", amount),
            CanonicalValue::Coordinate { lat, lon } => write!(f, "{}, {}", lat, lon),
            CanonicalValue::PointInTime { instant } => {
                write!(f, "{}", instant.format("%Y-%m-%dT%H:%M:%SZ"))
            }
            CanonicalValue::FileRef { title } => write!(f, "{}", title),
            CanonicalValue::EntityRef { label, .. } => write!(f, "{}", label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_value_kind_from_str() {
        assert_eq!("quantity".parse::<ValueKind>().unwrap(), ValueKind::Quantity);
        assert_eq!("Entity".parse::<ValueKind>().unwrap(), ValueKind::EntityRef);
        assert_eq!("date".parse::<ValueKind>().unwrap(), ValueKind::PointInTime);
        assert!(matches!(
            "blob".parse::<ValueKind>(),
            Err(HarvestError::UnsupportedValueKind(_))
        ));
    }

    #[test]
    fn test_same_variant_comparison() {
        let a = CanonicalValue::Quantity { amount: 60491.0 };
        let b = CanonicalValue::Quantity { amount: 60491.0 };
        let c = CanonicalValue::Quantity { amount: 100.0 };
        assert_eq!(a.compare(&b), Some(true));
        assert_eq!(a.compare(&c), Some(false));
    }

    #[test]
    fn test_cross_variant_not_comparable() {
        let q = CanonicalValue::Quantity { amount: 1952.0 };
        let t = CanonicalValue::PointInTime {
            instant: Utc.with_ymd_and_hms(1952, 1, 1, 0, 0, 0).unwrap(),
        };
        assert_eq!(q.compare(&t), None);
        assert_eq!(t.compare(&q), None);
    }

    #[test]
    fn test_text_comparison_is_case_sensitive() {
        let a = CanonicalValue::text("Monrovia");
        let b = CanonicalValue::text("monrovia");
        assert_eq!(a.compare(&b), Some(false));
    }

    #[test]
    fn test_coordinate_tuple_equality() {
        let a = CanonicalValue::Coordinate {
            lat: 51.7608,
            lon: -1.2639,
        };
        let b = CanonicalValue::Coordinate {
            lat: 51.7608,
            lon: -1.2639,
        };
        let c = CanonicalValue::Coordinate {
            lat: 51.7608,
            lon: 1.2639,
        };
        assert_eq!(a.compare(&b), Some(true));
        assert_eq!(a.compare(&c), Some(false));
    }

    #[test]
    fn test_entity_comparison_ignores_resolution_id() {
        let resolved = CanonicalValue::entity_with_id("Green Templeton College", "Q5603654");
        let unresolved = CanonicalValue::entity("Green Templeton College");
        assert_eq!(resolved.compare(&unresolved), Some(true));
    }

    #[test]
    fn test_serde_tagged_representation() {
        let v = CanonicalValue::Coordinate {
            lat: 51.7608,
            lon: -1.2639,
        };
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"type\":\"coordinate\""));
        let back: CanonicalValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
