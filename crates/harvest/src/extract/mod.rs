//! Locating candidate values for named attributes in source text.

mod pattern;

pub use pattern::{Extractor, KeyPattern, RawExtraction, SearchMode};
