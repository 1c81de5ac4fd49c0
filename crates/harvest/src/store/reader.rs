//! Reading stored claims into canonical form.

use crate::attribute::AttributeId;
use crate::error::Result;
use crate::value::{normalize, CanonicalValue, ValueKind};

use super::{ClaimValue, Record, StructuredStore};

/// Read the currently stored value for an attribute in canonical form.
///
/// When several claims exist for the attribute, only the first is read.
/// That mirrors the long-standing behavior of the scripts this engine
/// replaces; widening it to all claims is a product decision, not a bug
/// fix.
///
/// Type dispatch happens here, once: an item-typed claim canonicalizes to
/// the linked record's plain-language label (falling back to the raw id)
/// so downstream comparisons against prose work.
pub fn read_attribute(
    record: &Record,
    attribute: &AttributeId,
    store: &dyn StructuredStore,
) -> Result<Option<CanonicalValue>> {
    let claim = match record.first_claim(attribute) {
        Some(claim) => claim,
        None => return Ok(None),
    };

    let value = match &claim.value {
        ClaimValue::Text { value } => CanonicalValue::text(value.clone()),
        ClaimValue::Quantity { amount, .. } => CanonicalValue::Quantity { amount: *amount },
        ClaimValue::Coordinate { lat, lon } => CanonicalValue::Coordinate {
            lat: *lat,
            lon: *lon,
        },
        ClaimValue::Time { instant } => CanonicalValue::PointInTime { instant: *instant },
        ClaimValue::File { title } => normalize(title, ValueKind::FileRef),
        ClaimValue::Item { id } => {
            let label = store.label_of(id)?.unwrap_or_else(|| id.clone());
            CanonicalValue::entity_with_id(label, id.clone())
        }
    };

    Ok(Some(value))
}
