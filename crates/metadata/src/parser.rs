//! Tagger dump → [`MetadataRecord`].
//!
//! The tagger prints banners and progress lines around its JSON payload, and
//! different metadata backends wrap the payload differently and disagree on
//! key casing.  Parsing therefore happens in three stages:
//!
//! 1. brace-scan the raw text for the outermost `{ … }` span and parse it;
//! 2. decode the layout into a [`MetadataEnvelope`] (first match wins);
//! 3. walk a fixed candidate-key chain for every field.
//!
//! Candidate order is significant: once a key yields a non-blank value, later
//! keys are never consulted.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::filename::sanitize_component;
use crate::record::{Clock, MetadataRecord};

const SERIES_KEYS: &[&str] = &["series", "Series", "SERIES"];
const VOLUME_KEYS: &[&str] = &["volume", "Volume", "VOLUME"];
const ISSUE_KEYS: &[&str] = &["issue", "Issue", "ISSUE", "number", "Number"];
const YEAR_KEYS: &[&str] = &["year", "Year", "YEAR", "coverYear", "publicationYear"];

// ── Layout decoding ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WrappedShape {
    md: Value,
}

#[derive(Deserialize)]
struct ListedHead {
    metadata: Value,
}

#[derive(Deserialize)]
struct BareShape {
    #[serde(rename = "series")]
    _series: serde::de::IgnoredAny,
}

/// The known ways a tagger wraps its metadata object.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataEnvelope {
    /// `{ "md": { … } }`
    Wrapped(Value),
    /// `[ { "metadata": { … } }, … ]`; only the first element is inspected.
    Listed(Value),
    /// `{ "series": …, … }`: the object is the metadata itself.
    Bare(Value),
}

impl MetadataEnvelope {
    /// Try each layout in priority order.
    pub fn decode(value: &Value) -> Result<Self, ParseError> {
        match value {
            Value::Object(_) => {
                if let Ok(shape) = WrappedShape::deserialize(value) {
                    return Ok(Self::Wrapped(shape.md));
                }
                if BareShape::deserialize(value).is_ok() {
                    return Ok(Self::Bare(value.clone()));
                }
            }
            Value::Array(items) => {
                if let Some(head) = items.first().filter(|head| head.is_object()) {
                    if let Ok(shape) = ListedHead::deserialize(head) {
                        return Ok(Self::Listed(shape.metadata));
                    }
                }
            }
            _ => {}
        }
        Err(ParseError::UnrecognizedStructure)
    }

    pub fn metadata(&self) -> &Value {
        match self {
            Self::Wrapped(md) | Self::Listed(md) | Self::Bare(md) => md,
        }
    }
}

// ── Entry points ─────────────────────────────────────────────────────────────

/// Extract a record from raw tagger output that may surround the JSON payload
/// with arbitrary text.
pub fn parse_metadata(raw: &str, clock: &dyn Clock) -> Result<MetadataRecord, ParseError> {
    let json = locate_json(raw).ok_or(ParseError::NoJsonFound)?;
    let value: Value =
        serde_json::from_str(json).map_err(|err| ParseError::InvalidJson(err.to_string()))?;
    extract_record(&value, clock)
}

/// Extract a record from already-parsed JSON.
pub fn extract_record(value: &Value, clock: &dyn Clock) -> Result<MetadataRecord, ParseError> {
    let envelope = MetadataEnvelope::decode(value)?;
    let md = envelope.metadata();

    let series = first_present(md, SERIES_KEYS)
        .map(|raw| sanitize_component(&raw))
        .filter(|series| !series.is_empty())
        .ok_or(ParseError::MissingSeries)?;

    let volume = first_present(md, VOLUME_KEYS);

    let issue = first_present(md, ISSUE_KEYS)
        .map(|raw| clean_issue(&sanitize_component(&raw)))
        .filter(|issue| !issue.is_empty())
        .ok_or(ParseError::MissingIssue)?;

    let year = first_present(md, YEAR_KEYS).unwrap_or_else(|| clock.current_year().to_string());

    Ok(MetadataRecord {
        series,
        volume,
        issue,
        year,
    })
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Span from the first `{` to the last `}`, inclusive.
fn locate_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// First candidate key holding a non-blank string or a number, trimmed.
fn first_present(md: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| md.get(*key).and_then(scalar_text))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

/// Drop one run of leading zeros when a non-zero digit or a decimal point
/// follows it.  `"007"` → `"7"`, `"012.5"` → `"12.5"`, `"000"` unchanged.
fn clean_issue(raw: &str) -> String {
    let trimmed = raw.trim();
    let rest = trimmed.trim_start_matches('0');
    if rest.len() == trimmed.len() {
        return trimmed.to_string();
    }
    match rest.chars().next() {
        Some(c) if c == '.' || ('1'..='9').contains(&c) => rest.to_string(),
        _ => trimmed.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
