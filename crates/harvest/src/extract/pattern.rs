//! Pattern-based extraction of candidate values from wikitext.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HarvestError, Result};

static COORD_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\{\{coord\|").unwrap());

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+\.?\d*").unwrap());

/// Where a fact likely lives in the article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Structured `key = value` lines, the convention used by most
    /// infobox templates.
    Infobox,
    /// Free-form passage search over template-expanded text. Slower, but
    /// finds facts hidden in template nesting.
    FreeText,
}

/// A case-insensitive key pattern (literal or alternation) identifying the
/// textual label of a fact, compiled once at configuration time.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    literal: String,
    infobox: Regex,
    free: Regex,
}

impl KeyPattern {
    /// Compile a key pattern. Returns a configuration-time error for an
    /// invalid regex.
    pub fn new(pattern: &str) -> Result<Self> {
        let infobox = Regex::new(&format!(r"(?i){}[ \t]*=[ \t]*(.*)", pattern))?;
        let free = Regex::new(&format!(r"(?i){}", pattern))?;
        Ok(Self {
            literal: pattern.to_string(),
            infobox,
            free,
        })
    }

    /// The pattern text as supplied by configuration.
    pub fn literal(&self) -> &str {
        &self.literal
    }
}

/// The unprocessed text captured from source, tagged with the search mode
/// that produced it. Transient; lives for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExtraction {
    /// Originating subject (article title).
    pub subject: String,
    /// Which search mode produced the capture.
    pub mode: SearchMode,
    /// The captured text. May be empty when the matched field is empty.
    pub text: String,
}

/// Locates the best single raw value for a key pattern in source text.
#[derive(Debug, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Extractor
    }

    /// Extract the best candidate value for `key` from `text`.
    ///
    /// Returns `Ok(None)` when the pattern is absent; absence is expected,
    /// not an error. Free-text mode expects `text` to already be
    /// redirect-resolved and template-expanded by the caller.
    pub fn extract(
        &self,
        subject: &str,
        text: &str,
        key: &KeyPattern,
        mode: SearchMode,
    ) -> Result<Option<RawExtraction>> {
        let value = match mode {
            SearchMode::Infobox => self.extract_infobox(text, key)?,
            SearchMode::FreeText => self.extract_free_text(text, key),
        };
        Ok(value.map(|text| RawExtraction {
            subject: subject.to_string(),
            mode,
            text,
        }))
    }

    /// Scan for `key = value` lines and disambiguate repeated matches.
    fn extract_infobox(&self, text: &str, key: &KeyPattern) -> Result<Option<String>> {
        let candidates: Vec<Vec<String>> = key
            .infobox
            .captures_iter(text)
            .map(|caps| {
                (1..caps.len())
                    .map(|i| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            })
            .collect();

        if candidates.is_empty() {
            return Ok(None);
        }
        debug!(key = key.literal(), count = candidates.len(), "infobox candidates");

        // A pattern with its own capturing groups yields tuple candidates;
        // the skip/accept rule recurses one level into the sub-groups
        // before the candidates themselves are walked.
        let mut resolved = Vec::with_capacity(candidates.len());
        for groups in &candidates {
            resolved.push(match groups.as_slice() {
                [single] => single.trim().to_string(),
                tuple => pick_candidate(tuple, key.literal())?,
            });
        }
        let value = pick_candidate(&resolved, key.literal())?;

        Ok(Some(apply_coord_filter(&value)))
    }

    /// Single case-insensitive search; the value is the last capturing
    /// group that participated in the first match.
    fn extract_free_text(&self, text: &str, key: &KeyPattern) -> Option<String> {
        let caps = key.free.captures(text)?;
        let value = (1..caps.len())
            .rev()
            .find_map(|i| caps.get(i))
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Some(value)
    }
}

/// Walk candidates in order: skip key echoes (a capture that repeats the
/// pattern's own label), accept the first non-empty survivor, and fall
/// back to the last candidate examined when every one is empty. Multiple
/// differing non-empty survivors are surfaced, never guessed between.
fn pick_candidate(candidates: &[String], key_literal: &str) -> Result<String> {
    let mut survivors: Vec<&str> = Vec::new();
    let mut last = "";

    for candidate in candidates {
        let trimmed = candidate.trim();
        last = trimmed;
        if trimmed.is_empty() {
            continue;
        }
        if key_literal.contains(trimmed) {
            continue;
        }
        survivors.push(trimmed);
    }

    match survivors.as_slice() {
        [] => Ok(last.to_string()),
        [first, rest @ ..] => {
            if rest.iter().any(|s| s != first) {
                return Err(HarvestError::AmbiguousExtraction {
                    key: key_literal.to_string(),
                    candidates: survivors.iter().map(|s| s.to_string()).collect(),
                });
            }
            Ok(first.to_string())
        }
    }
}

/// Rewrite a `{{coord|...}}` capture as a `lat, lon` pair for the
/// normalizer's coordinate path.
fn apply_coord_filter(value: &str) -> String {
    if !COORD_MARKER.is_match(value) {
        return value.to_string();
    }
    let mut numbers = DECIMAL.find_iter(value).map(|m| m.as_str());
    match (numbers.next(), numbers.next()) {
        (Some(lat), Some(lon)) => format!("{}, {}", lat, lon),
        _ => value.to_string(),
    }
}
