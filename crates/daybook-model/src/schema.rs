use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::import::parse_number;
use crate::{parse_date, DateOrder, FieldValue, Row};

/// Errors that can occur when declaring a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema must declare at least one field")]
    EmptyFieldList,
    #[error("duplicate field name '{name}'")]
    DuplicateField { name: String },
    #[error("schema has no field named '{name}'")]
    UnknownField { name: String },
    #[error("date field '{name}' must be a date field")]
    DateFieldNotDate { name: String },
    #[error("ordinal field '{name}' must be a number field")]
    OrdinalFieldNotNumber { name: String },
    #[error("dedupe key must name at least one field")]
    EmptyDedupeKey,
}

/// Errors raised when conforming a candidate row at the form boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConformError {
    #[error("field '{field}' must not be negative")]
    NegativeNumber { field: String },
}

/// Declared type of a field's values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    /// Text constrained to a fixed option list at the form boundary.
    ///
    /// Stored values outside the list are kept as plain text rather than
    /// rejected, so older files load unchanged.
    Choice(Vec<String>),
}

impl FieldKind {
    /// Parse raw stored text into a typed value for this kind.
    ///
    /// Used at the file-store and import boundaries. Text that does not
    /// parse under the declared kind stays text; typing is best-effort on
    /// the way in and exact only for values this crate wrote itself.
    pub fn parse_text(&self, text: &str, order: DateOrder) -> FieldValue {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return FieldValue::Empty;
        }
        match self {
            FieldKind::Number => match parse_number(trimmed) {
                Some(n) => FieldValue::Number(n),
                None => FieldValue::Text(trimmed.to_string()),
            },
            FieldKind::Date => match parse_date(trimmed, order) {
                Some(d) => FieldValue::Date(d),
                None => FieldValue::Text(trimmed.to_string()),
            },
            FieldKind::Text | FieldKind::Choice(_) => FieldValue::Text(trimmed.to_string()),
        }
    }

    /// For [`FieldKind::Choice`], whether `text` is one of the options.
    /// Always true for other kinds.
    pub fn accepts_choice(&self, text: &str) -> bool {
        match self {
            FieldKind::Choice(options) => options.iter().any(|o| o == text),
            _ => true,
        }
    }
}

/// A named, typed field declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn choice(name: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            name,
            FieldKind::Choice(options.iter().map(|o| o.to_string()).collect()),
        )
    }
}

/// An ordered field list plus the parameters that distinguish one ledger
/// variant from another: sort date field, dedupe key, optional ordinal
/// (sequence) field, optional composite note field.
///
/// Validated once at construction; every accessor after that is infallible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
    date_field: usize,
    dedupe_key: Vec<usize>,
    ordinal_field: Option<usize>,
    note_field: Option<usize>,
    note_categories: Vec<String>,
    date_order: DateOrder,
}

impl Schema {
    /// Declare a schema from a field list, the date field used for sorting,
    /// and the dedupe key used by merge-import.
    pub fn new(
        fields: Vec<FieldDef>,
        date_field: &str,
        dedupe_key: &[&str],
    ) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::EmptyFieldList);
        }
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }
        if dedupe_key.is_empty() {
            return Err(SchemaError::EmptyDedupeKey);
        }

        let date_idx = index_of(&fields, date_field)?;
        if !matches!(fields[date_idx].kind, FieldKind::Date) {
            return Err(SchemaError::DateFieldNotDate {
                name: date_field.to_string(),
            });
        }

        let mut key = Vec::with_capacity(dedupe_key.len());
        for name in dedupe_key {
            key.push(index_of(&fields, name)?);
        }

        Ok(Self {
            fields,
            date_field: date_idx,
            dedupe_key: key,
            ordinal_field: None,
            note_field: None,
            note_categories: Vec::new(),
            date_order: DateOrder::default(),
        })
    }

    /// Declare a number field holding a 1-based display sequence that is
    /// renumbered after every structural mutation.
    pub fn with_ordinal_field(mut self, name: &str) -> Result<Self, SchemaError> {
        let idx = index_of(&self.fields, name)?;
        if !matches!(self.fields[idx].kind, FieldKind::Number) {
            return Err(SchemaError::OrdinalFieldNotNumber {
                name: name.to_string(),
            });
        }
        self.ordinal_field = Some(idx);
        Ok(self)
    }

    /// Declare the composite note field and its category list.
    pub fn with_note_field(mut self, name: &str, categories: &[&str]) -> Result<Self, SchemaError> {
        let idx = index_of(&self.fields, name)?;
        self.note_field = Some(idx);
        self.note_categories = categories.iter().map(|c| c.to_string()).collect();
        Ok(self)
    }

    /// Override the preferred order for ambiguous numeric dates.
    pub fn with_date_order(mut self, order: DateOrder) -> Self {
        self.date_order = order;
        self
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    pub fn date_field_index(&self) -> usize {
        self.date_field
    }

    pub fn dedupe_key_indices(&self) -> &[usize] {
        &self.dedupe_key
    }

    pub fn ordinal_field_index(&self) -> Option<usize> {
        self.ordinal_field
    }

    pub fn note_field_index(&self) -> Option<usize> {
        self.note_field
    }

    pub fn note_categories(&self) -> &[String] {
        &self.note_categories
    }

    pub fn date_order(&self) -> DateOrder {
        self.date_order
    }

    /// Conform a candidate row supplied by the form boundary.
    ///
    /// Unknown names are dropped, missing fields default to empty, values
    /// are coerced to their declared kind, and negative numbers in number
    /// fields are rejected (the form contract requires non-negative
    /// quantities).
    pub fn conform(&self, named: &[(String, FieldValue)]) -> Result<Row, ConformError> {
        let row = self.conform_lenient(named);
        for (field, value) in self.fields.iter().zip(row.values()) {
            if matches!(field.kind, FieldKind::Number) {
                if let Some(n) = value.as_number() {
                    if n < 0.0 {
                        return Err(ConformError::NegativeNumber {
                            field: field.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(row)
    }

    /// Conform without the form-boundary checks.
    ///
    /// Used for rows arriving from files and imports, which are never
    /// rejected for value contents: whatever was persisted loads back.
    pub fn conform_lenient(&self, named: &[(String, FieldValue)]) -> Row {
        let values = self
            .fields
            .iter()
            .map(|field| {
                let supplied = named
                    .iter()
                    .find(|(name, _)| name == &field.name)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(FieldValue::Empty);
                self.coerce(&field.kind, supplied)
            })
            .collect();
        Row::from_values(values)
    }

    fn coerce(&self, kind: &FieldKind, value: FieldValue) -> FieldValue {
        match (kind, value) {
            (_, FieldValue::Empty) => FieldValue::Empty,
            (kind, FieldValue::Text(s)) => kind.parse_text(&s, self.date_order),
            (FieldKind::Text | FieldKind::Choice(_), v) => FieldValue::Text(v.to_display_string()),
            (_, v) => v,
        }
    }

    /// The built-in daily sales-tax ledger schema shared by the original
    /// form variants: one line item per invoice, day-first dates, invoice
    /// number + customer reference as the merge identity, a renumbered
    /// sequence column, and a categorized remark.
    pub fn daily_sales() -> Self {
        let fields = vec![
            FieldDef::date("order_date"),
            FieldDef::number("seq_no"),
            FieldDef::text("invoice_no"),
            FieldDef::choice("seller", &["shopee", "lazada", "cent"]),
            FieldDef::text("customer_ref"),
            FieldDef::text("product_code"),
            FieldDef::text("color"),
            FieldDef::text("size"),
            FieldDef::number("price"),
            FieldDef::number("discount"),
            FieldDef::number("net"),
            FieldDef::date("tax_date"),
            FieldDef::number("amount"),
            FieldDef::number("shipping_metro"),
            FieldDef::number("shipping_region"),
            FieldDef::text("transfer_no"),
            FieldDef::text("remark"),
        ];
        // Indices below are pinned by the field list above; the wiring test
        // keeps them honest.
        Self {
            date_field: 0,
            dedupe_key: vec![2, 4],
            ordinal_field: Some(1),
            note_field: Some(fields.len() - 1),
            note_categories: crate::DEFAULT_NOTE_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            date_order: DateOrder::Dmy,
            fields,
        }
    }
}

fn index_of(fields: &[FieldDef], name: &str) -> Result<usize, SchemaError> {
    fields
        .iter()
        .position(|f| f.name == name)
        .ok_or_else(|| SchemaError::UnknownField {
            name: name.to_string(),
        })
}
