use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{FieldValue, Schema};

/// One ledger record: field values in schema order.
///
/// Identity is positional; the table index is the row's only handle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: Vec<FieldValue>,
}

impl Row {
    pub fn from_values(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    fn set(&mut self, index: usize, value: FieldValue) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// Pad or truncate to exactly `width` values.
    fn resize_to(&mut self, width: usize) {
        self.values.resize(width, FieldValue::Empty);
    }
}

/// The full ordered collection of rows currently loaded, plus the schema
/// they all share.
///
/// Invariant: every row has exactly `schema.len()` values in schema order.
/// Mutation entry points re-establish it by padding/truncating, so rows from
/// older files with missing columns are backfilled on the way in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table over a schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// A row's value for a named field.
    pub fn field_value(&self, row: usize, field: &str) -> Option<&FieldValue> {
        let idx = self.schema.field_index(field)?;
        self.rows.get(row)?.value(idx)
    }

    /// Append a row, padding or truncating it to the schema width.
    pub fn push_row(&mut self, mut row: Row) {
        row.resize_to(self.schema.len());
        self.rows.push(row);
    }

    /// Replace the row at `index` in place. No-op on an invalid index;
    /// callers validate positions before mutating.
    pub fn replace_row(&mut self, index: usize, mut row: Row) {
        row.resize_to(self.schema.len());
        if let Some(slot) = self.rows.get_mut(index) {
            *slot = row;
        }
    }

    pub fn remove_row(&mut self, index: usize) -> Row {
        self.rows.remove(index)
    }

    /// Stable sort by the schema's date field, ascending.
    ///
    /// Rows whose date value is absent or never parsed as a date sort
    /// first; equal-date rows keep their relative insertion order.
    pub fn sort_by_date(&mut self) {
        let idx = self.schema.date_field_index();
        self.rows
            .sort_by_key(|row| row.value(idx).and_then(FieldValue::as_date));
    }

    /// Remove rows whose dedupe key repeats an earlier row's, keeping the
    /// first occurrence in table order. Returns the number removed.
    ///
    /// Rows whose key fields are all empty never match each other; an
    /// absent invoice number is not an identity.
    pub fn dedupe_keep_first(&mut self) -> usize {
        let key_indices = self.schema.dedupe_key_indices().to_vec();
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let before = self.rows.len();
        self.rows.retain(|row| {
            let all_empty = key_indices
                .iter()
                .all(|&i| row.value(i).map_or(true, FieldValue::is_empty));
            if all_empty {
                return true;
            }
            let key: Vec<String> = key_indices
                .iter()
                .map(|&i| {
                    row.value(i)
                        .map(FieldValue::to_display_string)
                        .unwrap_or_default()
                })
                .collect();
            seen.insert(key)
        });
        before - self.rows.len()
    }

    /// Rewrite the ordinal field to `1..=len` in current table order, if the
    /// schema declares one.
    pub fn renumber_ordinal(&mut self) {
        let Some(idx) = self.schema.ordinal_field_index() else {
            return;
        };
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.set(idx, FieldValue::Number((i + 1) as f64));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldDef;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::new(
            vec![
                FieldDef::date("date"),
                FieldDef::number("seq"),
                FieldDef::text("invoice"),
            ],
            "date",
            &["invoice"],
        )
        .unwrap()
        .with_ordinal_field("seq")
        .unwrap()
    }

    fn row(date: Option<(i32, u32, u32)>, invoice: &str) -> Row {
        let date_value = date
            .and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
            .map(FieldValue::Date)
            .unwrap_or(FieldValue::Empty);
        Row::from_values(vec![date_value, FieldValue::Empty, invoice.into()])
    }

    #[test]
    fn push_backfills_short_rows() {
        let mut table = Table::new(schema());
        table.push_row(Row::from_values(vec![FieldValue::Empty]));
        assert_eq!(table.rows()[0].values().len(), 3);
    }

    #[test]
    fn sort_is_stable_and_puts_undated_rows_first() {
        let mut table = Table::new(schema());
        table.push_row(row(Some((2024, 1, 5)), "INV1"));
        table.push_row(row(None, "INV2"));
        table.push_row(row(Some((2024, 1, 1)), "INV3"));
        table.push_row(row(Some((2024, 1, 1)), "INV4"));
        table.sort_by_date();

        let order: Vec<_> = table
            .rows()
            .iter()
            .map(|r| r.value(2).unwrap().to_display_string())
            .collect();
        assert_eq!(order, ["INV2", "INV3", "INV4", "INV1"]);

        // Sorting an already-sorted table changes nothing.
        let snapshot = table.clone();
        table.sort_by_date();
        assert_eq!(table, snapshot);
    }

    #[test]
    fn dedupe_keeps_first_and_ignores_empty_keys() {
        let mut table = Table::new(schema());
        table.push_row(row(Some((2024, 1, 1)), "INV1"));
        table.push_row(row(Some((2024, 1, 2)), "INV1"));
        table.push_row(row(None, ""));
        table.push_row(row(None, ""));
        assert_eq!(table.dedupe_keep_first(), 1);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.field_value(0, "date").unwrap().as_date(),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
    }

    #[test]
    fn renumber_writes_one_based_sequence() {
        let mut table = Table::new(schema());
        table.push_row(row(Some((2024, 1, 5)), "INV1"));
        table.push_row(row(Some((2024, 1, 1)), "INV2"));
        table.sort_by_date();
        table.renumber_ordinal();
        assert_eq!(table.field_value(0, "seq"), Some(&FieldValue::Number(1.0)));
        assert_eq!(table.field_value(1, "seq"), Some(&FieldValue::Number(2.0)));
        assert_eq!(
            table.field_value(0, "invoice"),
            Some(&FieldValue::Text("INV2".into()))
        );
    }
}
