//! Canonical values and normalization of raw wikitext captures.

mod canonical;
mod normalize;

pub use canonical::{CanonicalValue, ValueKind};
pub use normalize::{clean_markup, normalize, CleanedText};
