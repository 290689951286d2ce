//! Per-type conversion between wire values and edit-control values.
//!
//! Decoding normalizes toward values that are always safe to render.
//! Encoding normalizes toward the wire shape the backend expects but never
//! fails: malformed numeric or structured text is passed through verbatim so
//! the backend, which is the validation authority, reports the problem.
//!
//! # Empty numeric input
//!
//! An empty (or whitespace-only) NUMBER control encodes to the raw text, the
//! same as any other unparsable number. It is never coerced to `0` and never
//! dropped from the attribute map.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};

use crate::schema::SchemaFieldType;

/// Value held by an edit control.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// Text typed into a single-line, numeric, date or multi-line control.
    Text(String),
    /// Checkbox state.
    Flag(bool),
    /// A wire value kept as-is for a pass-through type whose wire value was
    /// not a string (for example a number stored under an `UNKNOWN` field).
    Passthrough(Value),
}

impl FormValue {
    /// Whether a required-field check should reject this value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Flag(_) => false,
            Self::Passthrough(value) => value.is_null(),
        }
    }

    /// Text shown inside the control.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Flag(flag) => flag.to_string(),
            Self::Passthrough(Value::String(text)) => text.clone(),
            Self::Passthrough(value) => value.to_string(),
        }
    }
}

impl From<&str> for FormValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FormValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for FormValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

// ---------------------------------------------------------------------------
// Decode: wire -> control
// ---------------------------------------------------------------------------

/// Converts a wire value (possibly absent) into a control value.
#[must_use]
pub fn decode(field_type: SchemaFieldType, value: Option<&Value>) -> FormValue {
    let value = match value {
        None | Some(Value::Null) => return empty_control(field_type),
        Some(value) => value,
    };

    match field_type {
        SchemaFieldType::Date => FormValue::Text(
            parse_timestamp(value)
                .map(|ts| ts.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ),
        SchemaFieldType::Boolean => FormValue::Flag(is_truthy(value)),
        SchemaFieldType::Array | SchemaFieldType::Object => {
            FormValue::Text(serde_json::to_string_pretty(value).unwrap_or_default())
        }
        SchemaFieldType::Number => match value {
            Value::Number(number) => FormValue::Text(number.to_string()),
            other => passthrough(other),
        },
        SchemaFieldType::String | SchemaFieldType::Null | SchemaFieldType::Unknown => {
            passthrough(value)
        }
    }
}

/// Control value for a field with no wire value.
#[must_use]
pub fn empty_control(field_type: SchemaFieldType) -> FormValue {
    if field_type == SchemaFieldType::Boolean {
        FormValue::Flag(false)
    } else {
        FormValue::Text(String::new())
    }
}

fn passthrough(value: &Value) -> FormValue {
    match value {
        Value::String(text) => FormValue::Text(text.clone()),
        other => FormValue::Passthrough(other.clone()),
    }
}

// ---------------------------------------------------------------------------
// Encode: control -> wire
// ---------------------------------------------------------------------------

/// Converts a control value into its wire value. Never fails.
#[must_use]
pub fn encode(field_type: SchemaFieldType, value: &FormValue) -> Value {
    match field_type {
        SchemaFieldType::Boolean => Value::Bool(match value {
            FormValue::Flag(flag) => *flag,
            FormValue::Text(text) => !text.is_empty(),
            FormValue::Passthrough(raw) => is_truthy(raw),
        }),
        SchemaFieldType::Number => encode_number(value),
        SchemaFieldType::Date => encode_date(value),
        SchemaFieldType::Array | SchemaFieldType::Object => encode_structured(field_type, value),
        SchemaFieldType::String | SchemaFieldType::Null | SchemaFieldType::Unknown => {
            match value {
                FormValue::Text(text) => Value::String(text.clone()),
                FormValue::Flag(flag) => Value::Bool(*flag),
                FormValue::Passthrough(raw) => raw.clone(),
            }
        }
    }
}

fn encode_number(value: &FormValue) -> Value {
    match value {
        FormValue::Text(text) => parse_number(text).unwrap_or_else(|| Value::String(text.clone())),
        FormValue::Flag(flag) => Value::from(i64::from(*flag)),
        FormValue::Passthrough(raw) => raw.clone(),
    }
}

/// Parses numeric control text. Integers stay integers on the wire.
fn parse_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Value::from(int));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn encode_date(value: &FormValue) -> Value {
    let raw = match value {
        FormValue::Text(text) if text.trim().is_empty() => return Value::Null,
        FormValue::Passthrough(Value::Null) => return Value::Null,
        FormValue::Text(text) => Value::String(text.clone()),
        FormValue::Passthrough(raw) => raw.clone(),
        FormValue::Flag(flag) => Value::Bool(*flag),
    };
    match parse_timestamp(&raw) {
        Some(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => raw,
    }
}

fn encode_structured(field_type: SchemaFieldType, value: &FormValue) -> Value {
    let empty = || {
        if field_type == SchemaFieldType::Array {
            Value::Array(Vec::new())
        } else {
            Value::Object(serde_json::Map::new())
        }
    };
    match value {
        FormValue::Text(text) if text.trim().is_empty() => empty(),
        FormValue::Text(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        FormValue::Flag(false) | FormValue::Passthrough(Value::Null) => empty(),
        FormValue::Flag(true) => Value::Bool(true),
        FormValue::Passthrough(raw) => raw.clone(),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Truthiness used when coercing arbitrary wire values to a checkbox.
///
/// `null`, `false`, `0` and `""` are false; everything else, including empty
/// arrays and objects, is true.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Reads a timestamp from a wire value.
///
/// Accepts RFC 3339 strings, bare calendar dates (`YYYY-MM-DD`, midnight
/// UTC), zone-less date-times (read as UTC) and epoch milliseconds.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp_text(text.trim()),
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
