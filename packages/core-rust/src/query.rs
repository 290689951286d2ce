//! List query parameters, filter expressions and the wire query builder.
//!
//! [`QueryParams`] is both the request shape and the logical query key: two
//! params values that compare equal describe the same result page.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Comparison applied by a per-field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Contains,
    Eq,
    Gt,
    Lt,
}

impl FilterOperator {
    /// All operators in picker order.
    pub const ALL: [Self; 4] = [Self::Contains, Self::Eq, Self::Gt, Self::Lt];

    /// Wire name, the part before `:` in a filter expression.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Lt => "lt",
        }
    }

    /// Human-readable label for operator pickers.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Contains => "Contains",
            Self::Eq => "Equals",
            Self::Gt => "Greater Than",
            Self::Lt => "Less Than",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

/// Returned when parsing an operator name that is not `contains|eq|gt|lt`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter operator: {0}")]
pub struct UnknownOperator(pub String);

// ---------------------------------------------------------------------------
// Filter expressions
// ---------------------------------------------------------------------------

/// A single `operator:value` filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterExpr {
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterExpr {
    #[must_use]
    pub fn new(operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            operator,
            value: value.into(),
        }
    }

    /// Reads `operator:value`, splitting on the first `:`.
    ///
    /// Text without a recognised operator prefix is an `eq` match on the
    /// whole text, which is how the backend reads it too.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Some((op, value)) = raw.split_once(':') {
            if let Ok(operator) = op.parse() {
                return Self::new(operator, value);
            }
        }
        Self::new(FilterOperator::Eq, raw)
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operator.as_str(), self.value)
    }
}

/// Active per-field filters. At most one expression per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSet {
    entries: BTreeMap<String, FilterExpr>,
}

impl FilterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter for `field`, replacing any existing one.
    ///
    /// Returns `false` and leaves the set untouched when the field name or
    /// the value is empty.
    pub fn apply(&mut self, field: &str, operator: FilterOperator, value: &str) -> bool {
        if field.is_empty() || value.is_empty() {
            return false;
        }
        self.entries
            .insert(field.to_string(), FilterExpr::new(operator, value));
        true
    }

    /// Removes the filter for `field`, returning it if one was active.
    pub fn remove(&mut self, field: &str) -> Option<FilterExpr> {
        self.entries.remove(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FilterExpr> {
        self.entries.get(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Filters in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterExpr)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, FilterExpr)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, FilterExpr)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// QueryParams
// ---------------------------------------------------------------------------

/// Request shape for `GET /api/employees`.
///
/// Every field is optional; absent fields are absent from the wire query.
/// Defaults such as the page size belong to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    pub search: Option<String>,
    pub filters: FilterSet,
}

impl QueryParams {
    /// Sets the free-text search, trimming it and clearing it when blank.
    #[must_use]
    pub fn with_search(mut self, raw: &str) -> Self {
        self.set_search(raw);
        self
    }

    pub fn set_search(&mut self, raw: &str) {
        let trimmed = raw.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    /// Wire query entries. See [`build_query`].
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        build_query(self)
    }
}

/// Builds the wire query entries for `params`.
///
/// Pure and side-effect free. Only present, non-empty fields are emitted;
/// each filter becomes a top-level entry keyed by its field name with the
/// literal `operator:value` text as its value. Entry order carries no meaning.
#[must_use]
pub fn build_query(params: &QueryParams) -> Vec<(String, String)> {
    let mut query = Vec::with_capacity(5 + params.filters.len());

    if let Some(page) = params.page {
        query.push(("page".to_string(), page.to_string()));
    }
    if let Some(size) = params.size {
        query.push(("size".to_string(), size.to_string()));
    }
    if let Some(sort) = params.sort.as_deref().filter(|s| !s.is_empty()) {
        query.push(("sort".to_string(), sort.to_string()));
    }
    if let Some(direction) = params.direction {
        query.push(("direction".to_string(), direction.as_str().to_string()));
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        query.push(("search".to_string(), search.to_string()));
    }
    for (field, expr) in params.filters.iter() {
        query.push((field.to_string(), expr.to_string()));
    }

    query
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
