//! Schema-driven editable form.
//!
//! A [`DynamicForm`] owns one control value per schema field, seeded by
//! decoding an optional initial attribute map. Submitting validates required
//! fields, encodes every control back to its wire value and hands the
//! resulting attribute map to the submit handler.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::codec::{self, FormValue};
use crate::record::Attributes;
use crate::schema::{ordered_fields, SchemaField, SchemaFieldType};

/// Message attached to a required control left empty.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

// ---------------------------------------------------------------------------
// Control descriptors
// ---------------------------------------------------------------------------

/// Input widget used for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Checkbox,
    Number,
    Date,
    MultilineText,
    Text,
}

impl ControlKind {
    /// Widget for a declared field type. Unrecognised types get a text input.
    #[must_use]
    pub fn for_type(field_type: SchemaFieldType) -> Self {
        match field_type {
            SchemaFieldType::Boolean => Self::Checkbox,
            SchemaFieldType::Number => Self::Number,
            SchemaFieldType::Date => Self::Date,
            SchemaFieldType::Array | SchemaFieldType::Object => Self::MultilineText,
            SchemaFieldType::String | SchemaFieldType::Null | SchemaFieldType::Unknown => {
                Self::Text
            }
        }
    }

    #[must_use]
    pub fn placeholder(self) -> Option<&'static str> {
        match self {
            Self::MultilineText => Some("Enter JSON"),
            _ => None,
        }
    }

    /// Whether a control of this kind can hold `value`.
    #[must_use]
    pub fn accepts(self, value: &FormValue) -> bool {
        matches!(
            (self, value),
            (Self::Checkbox, FormValue::Flag(_))
                | (
                    Self::Number | Self::Date | Self::MultilineText | Self::Text,
                    FormValue::Text(_) | FormValue::Passthrough(_)
                )
        )
    }

    /// Numeric step attribute; `any` permits decimals.
    #[must_use]
    pub fn step(self) -> Option<&'static str> {
        match self {
            Self::Number => Some("any"),
            _ => None,
        }
    }
}

/// Everything a renderer needs to draw one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldControl {
    pub name: String,
    pub kind: ControlKind,
    pub required: bool,
    pub value: FormValue,
    pub invalid: bool,
    pub error: Option<&'static str>,
    pub placeholder: Option<&'static str>,
    pub step: Option<&'static str>,
}

impl FieldControl {
    /// Field label, with ` *` appended for required fields.
    #[must_use]
    pub fn label(&self) -> String {
        if self.required {
            format!("{} *", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Whether a form creates a new record or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

impl FormMode {
    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Edit { .. } => "Update",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by form operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("unknown form field: {0}")]
    UnknownField(String),
    #[error("value for {field} does not fit a {kind:?} control")]
    KindMismatch { field: String, kind: ControlKind },
    #[error("required fields are empty: {}", fields.join(", "))]
    RequiredMissing { fields: Vec<String> },
}

// ---------------------------------------------------------------------------
// DynamicForm
// ---------------------------------------------------------------------------

type SubmitHandler = Box<dyn FnMut(Attributes) + Send>;
type CancelHandler = Box<dyn FnMut() + Send>;

/// Editable form generated from a field list.
pub struct DynamicForm {
    fields: Vec<SchemaField>,
    initial: Option<Arc<Attributes>>,
    defaults: BTreeMap<String, FormValue>,
    values: BTreeMap<String, FormValue>,
    invalid: BTreeSet<String>,
    submit_label: String,
    on_submit: SubmitHandler,
    on_cancel: Option<CancelHandler>,
}

impl DynamicForm {
    /// Builds a form over `fields` (re-sorted into display order), seeded
    /// from `initial` when given.
    pub fn new<F>(
        fields: impl IntoIterator<Item = SchemaField>,
        initial: Option<Arc<Attributes>>,
        on_submit: F,
    ) -> Self
    where
        F: FnMut(Attributes) + Send + 'static,
    {
        let fields = ordered_fields(fields);
        let defaults = decode_defaults(&fields, initial.as_deref());
        Self {
            values: defaults.clone(),
            fields,
            initial,
            defaults,
            invalid: BTreeSet::new(),
            submit_label: "Save".to_string(),
            on_submit: Box::new(on_submit),
            on_cancel: None,
        }
    }

    /// Installs a cancel handler.
    #[must_use]
    pub fn with_cancel<F>(mut self, on_cancel: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_cancel = Some(Box::new(on_cancel));
        self
    }

    #[must_use]
    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    #[must_use]
    pub fn with_mode(self, mode: &FormMode) -> Self {
        self.with_submit_label(mode.submit_label())
    }

    #[must_use]
    pub fn submit_label(&self) -> &str {
        &self.submit_label
    }

    #[must_use]
    pub fn has_cancel(&self) -> bool {
        self.on_cancel.is_some()
    }

    /// Fields in display order.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Points the form at a new initial attribute map.
    ///
    /// When the map differs by identity from the current one, every control
    /// is re-decoded from it and validation marks are cleared. Passing the
    /// same `Arc` again is a no-op so edits in progress survive re-renders.
    pub fn set_initial(&mut self, initial: Option<Arc<Attributes>>) {
        let same = match (&self.initial, &initial) {
            (None, None) => true,
            (Some(current), Some(next)) => Arc::ptr_eq(current, next),
            _ => false,
        };
        if same {
            return;
        }
        self.defaults = decode_defaults(&self.fields, initial.as_deref());
        self.initial = initial;
        self.reset();
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&FormValue> {
        self.values.get(name)
    }

    /// Updates one control. A previously invalid control that now holds a
    /// value loses its invalid mark.
    ///
    /// Checkboxes take [`FormValue::Flag`]; every other control takes text or
    /// a pass-through value.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnknownField`] if `name` is not a form field, or
    /// [`FormError::KindMismatch`] if `value` does not fit its control.
    pub fn set_value(&mut self, name: &str, value: impl Into<FormValue>) -> Result<(), FormError> {
        let kind = self
            .fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| ControlKind::for_type(field.field_type))
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        let value = value.into();
        if !kind.accepts(&value) {
            return Err(FormError::KindMismatch {
                field: name.to_string(),
                kind,
            });
        }
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        *slot = value;
        if !slot.is_empty() {
            self.invalid.remove(name);
        }
        Ok(())
    }

    /// Names of fields currently marked invalid.
    pub fn invalid_fields(&self) -> impl Iterator<Item = &str> {
        self.invalid.iter().map(String::as_str)
    }

    /// Control descriptors in display order.
    #[must_use]
    pub fn controls(&self) -> Vec<FieldControl> {
        self.fields
            .iter()
            .map(|field| {
                let kind = ControlKind::for_type(field.field_type);
                let invalid = self.invalid.contains(&field.name);
                FieldControl {
                    name: field.name.clone(),
                    kind,
                    required: field.required,
                    value: self
                        .values
                        .get(&field.name)
                        .cloned()
                        .unwrap_or_else(|| codec::empty_control(field.field_type)),
                    invalid,
                    error: invalid.then_some(REQUIRED_MESSAGE),
                    placeholder: kind.placeholder(),
                    step: kind.step(),
                }
            })
            .collect()
    }

    /// Checks required fields and updates the invalid marks.
    ///
    /// Checkboxes always hold a value, so they never fail this check.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::RequiredMissing`] listing the empty fields.
    pub fn validate(&mut self) -> Result<(), FormError> {
        self.invalid = self
            .fields
            .iter()
            .filter(|field| field.required)
            .filter(|field| self.values.get(&field.name).map_or(true, FormValue::is_empty))
            .map(|field| field.name.clone())
            .collect();

        if self.invalid.is_empty() {
            Ok(())
        } else {
            Err(FormError::RequiredMissing {
                fields: self.invalid.iter().cloned().collect(),
            })
        }
    }

    /// Encodes every control into its wire value.
    #[must_use]
    pub fn encode(&self) -> Attributes {
        self.fields
            .iter()
            .map(|field| {
                let value = self
                    .values
                    .get(&field.name)
                    .cloned()
                    .unwrap_or_else(|| codec::empty_control(field.field_type));
                (field.name.clone(), codec::encode(field.field_type, &value))
            })
            .collect()
    }

    /// Validates, encodes, invokes the submit handler and resets the form.
    ///
    /// Returns the attributes handed to the handler.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::RequiredMissing`] without calling the handler
    /// when a required field is empty.
    pub fn submit(&mut self) -> Result<Attributes, FormError> {
        if let Err(err) = self.validate() {
            debug!(error = %err, "form submit blocked");
            return Err(err);
        }
        let attributes = self.encode();
        (self.on_submit)(attributes.clone());
        self.reset();
        Ok(attributes)
    }

    /// Invokes the cancel handler if one is installed. Nothing is encoded.
    ///
    /// Returns whether a handler ran.
    pub fn cancel(&mut self) -> bool {
        match self.on_cancel.as_mut() {
            Some(on_cancel) => {
                on_cancel();
                true
            }
            None => false,
        }
    }

    /// Restores every control to its initial value and clears invalid marks.
    pub fn reset(&mut self) {
        self.values.clone_from(&self.defaults);
        self.invalid.clear();
    }
}

impl fmt::Debug for DynamicForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicForm")
            .field("fields", &self.fields)
            .field("values", &self.values)
            .field("invalid", &self.invalid)
            .field("submit_label", &self.submit_label)
            .field("has_cancel", &self.on_cancel.is_some())
            .finish_non_exhaustive()
    }
}

fn decode_defaults(
    fields: &[SchemaField],
    initial: Option<&Attributes>,
) -> BTreeMap<String, FormValue> {
    fields
        .iter()
        .map(|field| {
            let wire = initial.and_then(|attrs| attrs.get(&field.name));
            (field.name.clone(), codec::decode(field.field_type, wire))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
