//! Runtime-discovered description of a record collection.
//!
//! The backend samples the collection and reports one [`SchemaField`] per
//! attribute name. The schema is immutable once fetched and replaced
//! wholesale on refetch. The display order derived by [`ordered_fields`] is
//! shared by form layout, table columns and filter-field choices.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// Declared type of a schema field.
///
/// Wire names are SCREAMING_CASE. Any name this client does not know
/// deserializes to [`SchemaFieldType::Unknown`] so a newer backend never
/// breaks schema loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaFieldType {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Object,
    Null,
    #[serde(other)]
    Unknown,
}

impl SchemaFieldType {
    /// Wire name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Array => "ARRAY",
            Self::Object => "OBJECT",
            Self::Null => "NULL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether values of this type are edited as structured JSON text.
    #[must_use]
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Array | Self::Object)
    }
}

impl std::fmt::Display for SchemaFieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SchemaField / SchemaResult
// ---------------------------------------------------------------------------

/// A single field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    /// Attribute name, unique within a schema.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: SchemaFieldType,
    /// Whether every record must carry a value for this field.
    pub required: bool,
    /// Whether `null` was observed for this field.
    #[serde(default)]
    pub nullable: bool,
    /// Element type for `ARRAY` fields, when the sample was homogeneous.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub array_item_type: Option<SchemaFieldType>,
}

impl SchemaField {
    /// Convenience constructor for a non-nullable field without item type.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: SchemaFieldType, required: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            required,
            nullable: false,
            array_item_type: None,
        }
    }
}

/// Response body of `GET /api/schema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResult {
    /// Backing collection name.
    pub collection: String,
    /// Number of documents sampled to infer the schema.
    pub sample_size: u32,
    /// When the backend generated this schema.
    pub generated_at: DateTime<Utc>,
    /// Field descriptors keyed by field name. Wire order carries no meaning.
    pub fields: HashMap<String, SchemaField>,
}

impl SchemaResult {
    /// Fields in display order. See [`ordered_fields`].
    #[must_use]
    pub fn ordered_fields(&self) -> Vec<SchemaField> {
        ordered_fields(self.fields.values().cloned())
    }
}

// ---------------------------------------------------------------------------
// Display ordering
// ---------------------------------------------------------------------------

/// Sorts fields into display order: required before optional, then by name.
#[must_use]
pub fn ordered_fields(fields: impl IntoIterator<Item = SchemaField>) -> Vec<SchemaField> {
    let mut fields: Vec<SchemaField> = fields.into_iter().collect();
    fields.sort_by(compare_fields);
    fields
}

/// Display-order comparator.
#[must_use]
pub fn compare_fields(a: &SchemaField, b: &SchemaField) -> Ordering {
    b.required
        .cmp(&a.required)
        .then_with(|| compare_names(&a.name, &b.name))
}

/// Locale-style name comparison.
///
/// Case-insensitive first so `alice < Bob < carol`. Names equal up to case
/// put the lowercase form first (`a < A`), keeping the order total.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| b.cmp(a))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
