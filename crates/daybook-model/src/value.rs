use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Versioned, JSON-friendly representation of a single field value.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Empty / unset field value.
    Empty,
    /// Free text.
    Text(String),
    /// IEEE-754 double precision number.
    Number(f64),
    /// Calendar date (no time component).
    Date(NaiveDate),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Empty
    }
}

impl FieldValue {
    /// Returns true if the value is [`FieldValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// The date carried by this value, if it is one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// The number carried by this value, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Canonical text rendering used for display, CSV export, and dedupe keys.
    ///
    /// Integral numbers render without a trailing `.0` (ledger files store
    /// quantities and invoice ordinals as bare integers); dates render ISO.
    pub fn to_display_string(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Date(d) => crate::format_date(*d),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
