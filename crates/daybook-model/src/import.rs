//! Projection of external tabular sources onto a ledger schema.
//!
//! Uploaded files bring their own column set. Merge-import requires the
//! incoming columns to cover every schema field; extra columns are dropped
//! and rows are projected down to schema order. Value parsing here is
//! lenient: imports are never rejected for cell contents, only for missing
//! columns.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{FieldValue, Row, Schema};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("import is missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },
}

/// An external table-like source: its own header names plus raw rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl ImportTable {
    /// Project every row down to `schema` order.
    ///
    /// Fails with the full list of missing columns when the incoming header
    /// does not cover the schema; in that case nothing is projected.
    pub fn project(&self, schema: &Schema) -> Result<Vec<Row>, ImportError> {
        let mut mapping = Vec::with_capacity(schema.len());
        let mut missing = Vec::new();
        for field in schema.fields() {
            match self
                .columns
                .iter()
                .position(|c| c.trim() == field.name)
            {
                Some(idx) => mapping.push(idx),
                None => missing.push(field.name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns { missing });
        }

        let rows = self
            .rows
            .iter()
            .map(|raw| {
                let values = schema
                    .fields()
                    .iter()
                    .zip(&mapping)
                    .map(|(field, &src)| {
                        let value = raw.get(src).cloned().unwrap_or(FieldValue::Empty);
                        match value {
                            FieldValue::Text(s) => field.kind.parse_text(&s, schema.date_order()),
                            other => other,
                        }
                    })
                    .collect();
                Row::from_values(values)
            })
            .collect();
        Ok(rows)
    }
}

/// Parse a number from loosely formatted text.
///
/// Accepts grouping separators (`1,250.50`, `1 250`), a leading sign, and
/// plain scientific notation. The decimal separator is `.`; `,` groups.
pub fn parse_number(text: &str) -> Option<f64> {
    let s = text.trim();
    let (sign, body) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest.trim_start()),
        None => (1.0, s.strip_prefix('+').unwrap_or(s).trim_start()),
    };
    if body.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(body.len());
    let mut saw_digit = false;
    let mut saw_decimal = false;
    let mut saw_exp = false;

    for ch in body.chars() {
        if ch.is_ascii_digit() {
            saw_digit = true;
            out.push(ch);
            continue;
        }
        match ch {
            '.' if !saw_decimal && !saw_exp => {
                saw_decimal = true;
                out.push('.');
            }
            ',' | ' ' | '\u{00A0}' if !saw_exp => {}
            'e' | 'E' if saw_digit && !saw_exp => {
                saw_exp = true;
                out.push('e');
            }
            '+' | '-' if out.ends_with('e') => out.push(ch),
            _ => return None,
        }
    }

    if !saw_digit || out.ends_with('e') || out.ends_with('+') || out.ends_with('-') {
        return None;
    }
    out.parse::<f64>().ok().map(|n| n * sign)
}
