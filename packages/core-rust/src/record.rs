//! Record and page wire types plus the table/pagination presentation helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open attribute map of a record. Keys need not match the current schema.
pub type Attributes = serde_json::Map<String, Value>;

/// A single employee record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Opaque backend identifier.
    pub id: String,
    /// Schema-described attributes.
    #[serde(default)]
    pub attributes: Attributes,
    /// Soft-delete marker.
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of create, replace and patch requests.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpsertRequest {
    pub attributes: Attributes,
}

impl From<Attributes> for UpsertRequest {
    fn from(attributes: Attributes) -> Self {
        Self { attributes }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> PageResponse<T> {
    /// An empty first page of the given size.
    #[must_use]
    pub fn empty(size: u32) -> Self {
        Self {
            content: Vec::new(),
            total_elements: 0,
            page: 0,
            size,
            total_pages: 0,
            has_next: false,
            has_previous: false,
        }
    }

    /// Checks `page < total_pages` (unless there are no pages) and
    /// `content.len() <= size`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let page_in_range = self.total_pages == 0 || self.page < self.total_pages;
        let fits = u32::try_from(self.content.len()).is_ok_and(|len| len <= self.size);
        page_in_range && fits
    }

    #[must_use]
    pub fn can_go_previous(&self) -> bool {
        self.page > 0
    }

    #[must_use]
    pub fn can_go_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }

    /// One-based position text, e.g. `Page 2 of 5`, or `Page 0 of 0`.
    #[must_use]
    pub fn position_label(&self) -> String {
        let current = if self.total_pages == 0 { 0 } else { self.page.saturating_add(1) };
        format!("Page {current} of {}", self.total_pages)
    }
}

/// Text rendered in a table cell for an attribute value.
///
/// Arrays and objects are pretty-printed with two-space indentation, null or
/// missing values render empty, strings render without quotes.
#[must_use]
pub fn format_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(structured @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::to_string_pretty(structured).unwrap_or_default()
        }
        Some(scalar) => scalar.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page(page: u32, total_pages: u32, len: usize, size: u32) -> PageResponse<u32> {
        PageResponse {
            content: vec![0; len],
            total_elements: u64::from(total_pages) * u64::from(size),
            page,
            size,
            total_pages,
            has_next: page + 1 < total_pages,
            has_previous: page > 0,
        }
    }

    #[test]
    fn record_parses_camel_case_wire_shape() {
        let json = r#"{
            "id": "65f0",
            "attributes": {"name": "Ada", "age": 36},
            "deleted": false,
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-02T10:00:00.123Z"
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "65f0");
        assert_eq!(record.attributes["age"], json!(36));
        assert!(record.updated_at > record.created_at);
    }

    #[test]
    fn page_response_parses_wire_shape() {
        let json = r#"{"content":[],"totalElements":0,"page":0,"size":10,"totalPages":0,"hasNext":false,"hasPrevious":false}"#;
        let parsed: PageResponse<Record> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, PageResponse::empty(10));
        assert!(parsed.is_consistent());
    }

    #[test]
    fn consistency_checks_page_bounds_and_size() {
        assert!(page(1, 3, 10, 10).is_consistent());
        assert!(!page(3, 3, 0, 10).is_consistent());
        assert!(!page(0, 1, 11, 10).is_consistent());
    }

    #[test]
    fn pagination_controls() {
        let first = page(0, 3, 10, 10);
        assert!(!first.can_go_previous());
        assert!(first.can_go_next());
        assert_eq!(first.position_label(), "Page 1 of 3");

        let last = page(2, 3, 4, 10);
        assert!(last.can_go_previous());
        assert!(!last.can_go_next());

        assert_eq!(PageResponse::<u32>::empty(10).position_label(), "Page 0 of 0");
    }

    #[test]
    fn pagination_controls_survive_max_page_index() {
        let bogus = PageResponse::<u32> {
            page: u32::MAX,
            total_pages: u32::MAX,
            ..PageResponse::empty(10)
        };
        assert!(!bogus.can_go_next());
        assert!(bogus.can_go_previous());
        assert_eq!(bogus.position_label(), format!("Page {} of {}", u32::MAX, u32::MAX));
    }

    #[test]
    fn cells_render_by_value_kind() {
        assert_eq!(format_cell(None), "");
        assert_eq!(format_cell(Some(&Value::Null)), "");
        assert_eq!(format_cell(Some(&json!("Ada"))), "Ada");
        assert_eq!(format_cell(Some(&json!(3.5))), "3.5");
        assert_eq!(format_cell(Some(&json!(true))), "true");
        assert_eq!(format_cell(Some(&json!(["x"]))), "[\n  \"x\"\n]");
    }

    #[test]
    fn upsert_request_serializes_attributes_envelope() {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), json!("Ada"));
        let body = serde_json::to_value(UpsertRequest::from(attributes)).unwrap();
        assert_eq!(body, json!({"attributes": {"name": "Ada"}}));
    }
}
