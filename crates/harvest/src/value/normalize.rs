//! Syntactic cleanup of raw wikitext captures and typed normalization.
//!
//! This is a best-effort cleanup, not a markup parser. Link targets are
//! never resolved here; entity resolution is the reconciler's job.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::canonical::{CanonicalValue, ValueKind};

static WIKILINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[(.*?)\]\]").unwrap());

static TEMPLATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{\{\s*([^|{}]+?)\s*\|(.*)\}\}").unwrap());

// Namespace-style prefixes before ':' ("Category:", "Commons:", "fr:"),
// optionally behind a leading colon. URL schemes are excluded by the "//"
// check in strip_prefix.
static NAMESPACE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*:?[A-Za-z][A-Za-z_\-]*:\s*").unwrap());

static FILE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:file|image)\s*:\s*").unwrap());

// Template names whose arguments carry a numeric quantity.
static QUANTITY_TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:us\$|currency|convert|val|formatnum)$").unwrap());

static CURRENCY_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:us\$|[$€£¥])").unwrap());

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+\.?\d*").unwrap());

static NUMERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").unwrap());

static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());

static EMBEDDED_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

/// Date formats commonly seen in article infoboxes.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d %B %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%Y/%m/%d",
];

/// Result of stripping wrapping link/template markup from a raw capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedText {
    /// Link target (first pipe-delimited segment): what entity resolution
    /// looks up.
    pub target: String,
    /// Display text (last pipe-delimited segment): the cleaned literal
    /// text a value falls back to.
    pub display: String,
}

/// Strip wrapping wikilink/template markup from a raw capture.
///
/// `[[Foo College, Oxford|Foo College]]` yields target `Foo College, Oxford`
/// and display `Foo College`; a namespace-style prefix before `:` is
/// dropped from both; `{{A|B}}` yields its first pipe-separated argument.
pub fn clean_markup(raw: &str) -> CleanedText {
    let trimmed = raw.trim();

    if let Some(caps) = WIKILINK.captures(trimmed) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let mut segments = inner.split('|');
        let target = segments.next().unwrap_or_default();
        let display = segments.next_back().unwrap_or(target);
        return CleanedText {
            target: strip_prefix(target),
            display: strip_prefix(display),
        };
    }

    if let Some(caps) = TEMPLATE.captures(trimmed) {
        let args = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let first = args.split('|').next().unwrap_or_default().trim();
        return CleanedText {
            target: first.to_string(),
            display: first.to_string(),
        };
    }

    let cleaned = strip_prefix(trimmed);
    CleanedText {
        target: cleaned.clone(),
        display: cleaned,
    }
}

fn strip_prefix(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(found) = NAMESPACE_PREFIX.find(trimmed) {
        let rest = &trimmed[found.end()..];
        if !rest.starts_with("//") {
            return rest.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Whether the raw capture is a template invocation carrying a quantity:
/// either the template name is a known currency/conversion template, or
/// its first argument leads with a currency marker.
fn is_quantity_template(raw: &str) -> bool {
    let Some(caps) = TEMPLATE.captures(raw.trim()) else {
        return false;
    };
    if caps
        .get(1)
        .is_some_and(|name| QUANTITY_TEMPLATE.is_match(name.as_str().trim()))
    {
        return true;
    }
    caps.get(2)
        .and_then(|args| args.as_str().split('|').next())
        .is_some_and(|first| CURRENCY_ARG.is_match(first.trim()))
}

/// Normalize a raw extracted string into a canonical typed value.
///
/// Normalization never fails: text that does not parse under the hinted
/// kind falls back to `Text` with the cleaned display form, which keeps it
/// comparable and lets the reconciler surface the mismatch.
///
/// The `EntityRef` hint yields the cleaned display text only; upgrading it
/// to the target record's label requires the collaborators and is done by
/// the reconciler.
pub fn normalize(raw: &str, hint: ValueKind) -> CanonicalValue {
    match hint {
        ValueKind::Text => {
            if is_quantity_template(raw) {
                parse_quantity(raw)
            } else {
                CanonicalValue::text(clean_markup(raw).display)
            }
        }
        ValueKind::Quantity => parse_quantity(raw),
        ValueKind::Coordinate => parse_coordinate(raw),
        ValueKind::PointInTime => parse_time(raw),
        ValueKind::FileRef => normalize_file(raw),
        ValueKind::EntityRef => CanonicalValue::entity(clean_markup(raw).display),
    }
}

/// Parse a leading numeral, discarding thousands separators and trailing
/// parenthetical qualifiers: `"60,491 (football)"` becomes `60491`.
fn parse_quantity(raw: &str) -> CanonicalValue {
    let before_parenthetical = raw.split('(').next().unwrap_or(raw);
    match NUMERAL
        .find(before_parenthetical)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
    {
        Some(amount) => CanonicalValue::Quantity { amount },
        None => CanonicalValue::text(clean_markup(raw).display),
    }
}

/// Read the first two decimal numbers as (latitude, longitude).
fn parse_coordinate(raw: &str) -> CanonicalValue {
    let mut numbers = DECIMAL
        .find_iter(raw)
        .filter_map(|m| m.as_str().parse::<f64>().ok());
    match (numbers.next(), numbers.next()) {
        (Some(lat), Some(lon)) => CanonicalValue::Coordinate { lat, lon },
        _ => CanonicalValue::text(clean_markup(raw).display),
    }
}

/// Canonicalize a year or date string to a single instant.
fn parse_time(raw: &str) -> CanonicalValue {
    let text = clean_markup(raw).display;
    let trimmed = text.trim();

    if BARE_YEAR.is_match(trimmed) {
        if let Some(instant) = trimmed.parse::<i32>().ok().and_then(year_start) {
            return CanonicalValue::PointInTime { instant };
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            if let Some(instant) = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()) {
                return CanonicalValue::PointInTime { instant };
            }
        }
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return CanonicalValue::PointInTime {
            instant: instant.with_timezone(&Utc),
        };
    }

    // Dates wrapped in extra prose ("released 1952 in ...") still carry a
    // usable year.
    if let Some(instant) = EMBEDDED_YEAR
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .and_then(year_start)
    {
        return CanonicalValue::PointInTime { instant };
    }

    CanonicalValue::text(text)
}

fn year_start(year: i32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()
}

/// Normalize a file name to the single canonical `File:` prefix.
fn normalize_file(raw: &str) -> CanonicalValue {
    let name = clean_markup(raw).display;
    let bare = FILE_PREFIX.replace(&name, "");
    CanonicalValue::FileRef {
        title: format!("File:{}", bare.trim()),
    }
}
