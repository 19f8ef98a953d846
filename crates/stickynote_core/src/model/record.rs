//! Persisted record shapes and lenient decoding.
//!
//! # Responsibility
//! - Define the wire shape of the notes array and the session state record.
//! - Decode blobs written by any earlier version, tolerating missing or
//!   mistyped fields.
//!
//! # Invariants
//! - A blob that is not JSON, or not the expected container, is a
//!   `ParseError`; callers treat it as empty.
//! - Inside a valid notes array, a non-object element is skipped, never
//!   fatal to the remaining elements.
//! - Geometry is written as plain numbers; `"250px"` strings are accepted on
//!   read.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

static MEASURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*(?:px)?\s*$")
        .expect("valid measurement regex")
});

/// Error for blobs that cannot be decoded or encoded.
#[derive(Debug)]
pub enum ParseError {
    /// JSON syntax or serialization failure.
    Json(serde_json::Error),
    /// Notes blob is valid JSON but not an array.
    NotAnArray,
    /// Session blob is valid JSON but not an object.
    NotAnObject,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "malformed record json: {err}"),
            Self::NotAnArray => write!(f, "notes record is not an array"),
            Self::NotAnObject => write!(f, "session record is not an object"),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::NotAnArray | Self::NotAnObject => None,
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// One persisted note.
///
/// Optional fields are `None` only for records decoded from older or damaged
/// blobs; the registry always writes every field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub content: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_color: Option<String>,
    pub is_collapsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// Process-wide state persisted next to the notes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_color_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_top: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_top: Option<f64>,
}

/// Result of decoding a notes blob.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedNotes {
    pub records: Vec<NoteRecord>,
    /// Elements dropped because they were not objects.
    pub skipped: usize,
}

/// Decodes a notes array blob.
///
/// # Errors
/// - `ParseError::Json` when `raw` is not JSON.
/// - `ParseError::NotAnArray` when the top-level value is not an array.
pub fn decode_notes(raw: &str) -> Result<DecodedNotes, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Array(items) = value else {
        return Err(ParseError::NotAnArray);
    };

    let mut decoded = DecodedNotes::default();
    for item in &items {
        match item.as_object() {
            Some(fields) => decoded.records.push(note_record_from_fields(fields)),
            None => decoded.skipped += 1,
        }
    }
    Ok(decoded)
}

/// Encodes records as a JSON array.
pub fn encode_notes(records: &[NoteRecord]) -> Result<String, ParseError> {
    Ok(serde_json::to_string(records)?)
}

/// Decodes a session state blob; mistyped fields read as absent.
///
/// # Errors
/// - `ParseError::Json` when `raw` is not JSON.
/// - `ParseError::NotAnObject` when the top-level value is not an object.
pub fn decode_session(raw: &str) -> Result<SessionStateRecord, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(fields) = value else {
        return Err(ParseError::NotAnObject);
    };

    Ok(SessionStateRecord {
        next_color_index: read_index(&fields, "nextColorIndex"),
        panel_left: read_measure(&fields, "panelLeft"),
        panel_top: read_measure(&fields, "panelTop"),
        control_left: read_measure(&fields, "controlLeft"),
        control_top: read_measure(&fields, "controlTop"),
    })
}

pub fn encode_session(record: &SessionStateRecord) -> Result<String, ParseError> {
    Ok(serde_json::to_string(record)?)
}

/// Parses a measurement written as a number, numeric string, or `"<n>px"`.
pub fn parse_measure(raw: &str) -> Option<f64> {
    let captures = MEASURE_RE.captures(raw)?;
    let value = captures.get(1)?.as_str().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

fn note_record_from_fields(fields: &Map<String, Value>) -> NoteRecord {
    NoteRecord {
        id: read_id(fields, "id"),
        left: read_measure(fields, "left"),
        top: read_measure(fields, "top"),
        width: read_measure(fields, "width"),
        height: read_measure(fields, "height"),
        content: read_text(fields, "content"),
        title: read_text(fields, "title"),
        color_index: read_index(fields, "colorIndex"),
        custom_color: fields
            .get("customColor")
            .and_then(Value::as_str)
            .map(str::to_string),
        is_collapsed: fields
            .get("isCollapsed")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        opacity: read_measure(fields, "opacity"),
    }
}

fn read_id(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn read_text(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn read_measure(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(value) => value.as_f64().filter(|value| value.is_finite()),
        Value::String(value) => parse_measure(value),
        _ => None,
    }
}

fn read_index(fields: &Map<String, Value>, key: &str) -> Option<usize> {
    match fields.get(key)? {
        Value::Number(value) => value.as_u64().and_then(|index| usize::try_from(index).ok()),
        Value::String(value) => value.trim().parse::<usize>().ok(),
        _ => None,
    }
}
