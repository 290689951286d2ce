//! Employee directory core: schema model, value codec, dynamic forms and the
//! list query builder.
//!
//! Everything here is synchronous and free of I/O; the `directory-client`
//! crate drives it over HTTP.

pub mod codec;
pub mod form;
pub mod query;
pub mod record;
pub mod schema;

pub use codec::FormValue;
pub use form::{ControlKind, DynamicForm, FieldControl, FormError, FormMode};
pub use query::{
    build_query, FilterExpr, FilterOperator, FilterSet, QueryParams, SortDirection,
};
pub use record::{format_cell, Attributes, PageResponse, Record, UpsertRequest};
pub use schema::{ordered_fields, SchemaField, SchemaFieldType, SchemaResult};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_feeds_form_and_query() {
        let fields = ordered_fields(vec![
            SchemaField::new("age", SchemaFieldType::Number, false),
            SchemaField::new("name", SchemaFieldType::String, true),
        ]);
        let form = DynamicForm::new(fields.clone(), None, |_| {});
        assert_eq!(form.fields(), fields.as_slice());

        let mut filters = FilterSet::new();
        filters.apply(&fields[1].name, FilterOperator::Gt, "30");
        let query = build_query(&QueryParams {
            filters,
            ..QueryParams::default()
        });
        assert_eq!(query, vec![("age".to_string(), "gt:30".to_string())]);
    }
}
