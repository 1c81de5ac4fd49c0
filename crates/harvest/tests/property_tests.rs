//! Property-based tests for extraction and normalization.
//!
//! These tests use proptest to generate random inputs and verify that the
//! core maintains its invariants under all conditions:
//!
//! 1. **No panics**: extraction and normalization never crash on any input
//! 2. **Determinism**: same input always produces same output
//! 3. **Contracts**: well-formed `key = value` lines always yield the
//!    trimmed right-hand side

use proptest::prelude::*;

use harvest::{normalize, CanonicalValue, Extractor, KeyPattern, SearchMode, ValueKind};

// =============================================================================
// Test Strategies
// =============================================================================

/// Simple infobox field labels.
fn field_key() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{2,15}"
}

/// Field values without '=' (which would start a second field) and
/// without newlines.
fn field_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 \\[\\]|.,'()-]{0,40}"
}

/// Arbitrary article-ish text.
fn arbitrary_text() -> impl Strategy<Value = String> {
    "[ -~\\n]{0,200}"
}

const ALL_KINDS: &[ValueKind] = &[
    ValueKind::Text,
    ValueKind::Quantity,
    ValueKind::Coordinate,
    ValueKind::PointInTime,
    ValueKind::FileRef,
    ValueKind::EntityRef,
];

// =============================================================================
// Extraction Properties
// =============================================================================

proptest! {
    #[test]
    fn well_formed_line_yields_trimmed_rhs(key in field_key(), value in field_value()) {
        // Keys that echo into the value would trigger the skip rule; that
        // path is covered by unit tests, so keep the pair disjoint here.
        prop_assume!(!key.contains(value.trim()) || value.trim().is_empty());

        let text = format!("| {} = {}\n", key, value);
        let pattern = KeyPattern::new(&key).unwrap();
        let raw = Extractor::new()
            .extract("Subject", &text, &pattern, SearchMode::Infobox)
            .unwrap()
            .expect("a well-formed line always matches");
        prop_assert_eq!(raw.text, value.trim());
    }

    #[test]
    fn infobox_extraction_never_panics(text in arbitrary_text(), key in field_key()) {
        let pattern = KeyPattern::new(&key).unwrap();
        // Ambiguity is a legal outcome; panics are not.
        let _ = Extractor::new().extract("Subject", &text, &pattern, SearchMode::Infobox);
    }

    #[test]
    fn free_text_absence_never_errors(text in arbitrary_text()) {
        let pattern = KeyPattern::new(r"(https?://www\.netflix\.com/title)/(\d{6,8})").unwrap();
        let result = Extractor::new()
            .extract("Subject", &text, &pattern, SearchMode::FreeText)
            .unwrap();
        if let Some(raw) = result {
            // Anything found must look like the last capturing group.
            prop_assert!(raw.text.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn extraction_is_deterministic(text in arbitrary_text(), key in field_key()) {
        let pattern = KeyPattern::new(&key).unwrap();
        let extractor = Extractor::new();
        let first = extractor.extract("Subject", &text, &pattern, SearchMode::Infobox);
        let second = extractor.extract("Subject", &text, &pattern, SearchMode::Infobox);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "determinism violated"),
        }
    }
}

// =============================================================================
// Normalization Properties
// =============================================================================

proptest! {
    #[test]
    fn normalization_never_panics(raw in arbitrary_text()) {
        for kind in ALL_KINDS {
            let _ = normalize(&raw, *kind);
        }
    }

    #[test]
    fn normalization_is_deterministic(raw in arbitrary_text()) {
        for kind in ALL_KINDS {
            prop_assert_eq!(normalize(&raw, *kind), normalize(&raw, *kind));
        }
    }

    #[test]
    fn plain_integers_normalize_to_their_quantity(n in 0u32..1_000_000_000) {
        let value = normalize(&n.to_string(), ValueKind::Quantity);
        prop_assert_eq!(value, CanonicalValue::Quantity { amount: n as f64 });
    }

    #[test]
    fn comparison_is_reflexive(raw in arbitrary_text()) {
        for kind in ALL_KINDS {
            let value = normalize(&raw, *kind);
            prop_assert_eq!(value.compare(&value), Some(true));
        }
    }

    #[test]
    fn cross_kind_comparison_is_never_true(a in 0u32..100_000, b in 0u32..100_000) {
        let quantity = CanonicalValue::Quantity { amount: a as f64 };
        let text = CanonicalValue::text(b.to_string());
        prop_assert_eq!(quantity.compare(&text), None);
    }
}
