use std::borrow::Cow;
use std::path::{Path, PathBuf};

use csv::ByteRecord;
use encoding_rs::WINDOWS_1252;

use daybook_model::{FieldValue, ImportTable, Row, Schema, Table};

use crate::atomic::atomic_write;
use crate::{ReadError, TabularStore, WriteError};

/// CSV-backed ledger store: header row of field names in schema order, one
/// record per row.
#[derive(Clone, Debug)]
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularStore for CsvLedger {
    /// Read the ledger back through its schema.
    ///
    /// Columns are matched to fields by header name, so a file written by an
    /// older schema loads with its missing columns backfilled empty and any
    /// unknown columns ignored. A file with no header at all is an empty
    /// ledger.
    fn read(&self, schema: &Schema) -> Result<Option<Table>, ReadError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            // Headers are handled manually so column mapping and error
            // positions stay consistent.
            .has_headers(false)
            // Accept rows with varying column counts.
            .flexible(true)
            .from_path(&self.path)
            .map_err(map_csv_read_error)?;

        let mut record = ByteRecord::new();
        let mut record_index: u64 = 0;

        let has_header = reader
            .read_byte_record(&mut record)
            .map_err(map_csv_read_error)?;
        if !has_header {
            return Ok(Some(Table::new(schema.clone())));
        }
        record_index += 1;

        let header: Vec<String> = decode_record(&record, record_index);
        // Schema field position -> file column position, where present.
        let mapping: Vec<Option<usize>> = schema
            .fields()
            .iter()
            .map(|field| header.iter().position(|h| h.trim() == field.name))
            .collect();

        let mut table = Table::new(schema.clone());
        loop {
            record.clear();
            match reader.read_byte_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    record_index += 1;
                    let raw = decode_record(&record, record_index);
                    let values = schema
                        .fields()
                        .iter()
                        .zip(&mapping)
                        .map(|(field, src)| match src {
                            Some(idx) => {
                                let text = raw.get(*idx).map(String::as_str).unwrap_or("");
                                field.kind.parse_text(text, schema.date_order())
                            }
                            None => FieldValue::Empty,
                        })
                        .collect();
                    table.push_row(Row::from_values(values));
                }
                Err(e) => {
                    return Err(match map_csv_read_error(e) {
                        // The csv crate reports record 0 for errors without a
                        // position; substitute the record we were reading.
                        ReadError::Parse { record: 0, reason } => ReadError::Parse {
                            record: record_index + 1,
                            reason,
                        },
                        other => other,
                    })
                }
            }
        }

        Ok(Some(table))
    }

    fn write(&mut self, table: &Table) -> Result<(), WriteError> {
        atomic_write(&self.path, |file| {
            let mut writer = csv::Writer::from_writer(file);
            let header: Vec<&str> = table
                .schema()
                .fields()
                .iter()
                .map(|f| f.name.as_str())
                .collect();
            writer.write_record(&header)?;
            for row in table.rows() {
                let record: Vec<String> =
                    row.values().iter().map(FieldValue::to_display_string).collect();
                writer.write_record(&record)?;
            }
            writer.flush()?;
            Ok(())
        })
    }
}

/// Read an arbitrary headered CSV as an [`ImportTable`] for merge-import.
///
/// Values come back as raw text; typing happens when the table is projected
/// onto a schema.
pub fn read_import_file(path: impl AsRef<Path>) -> Result<ImportTable, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_ref())
        .map_err(map_csv_read_error)?;

    let mut record = ByteRecord::new();
    let mut record_index: u64 = 0;

    let has_header = reader
        .read_byte_record(&mut record)
        .map_err(map_csv_read_error)?;
    if !has_header {
        return Ok(ImportTable::default());
    }
    record_index += 1;
    let columns = decode_record(&record, record_index);

    let mut rows = Vec::new();
    loop {
        record.clear();
        match reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                record_index += 1;
                let values = decode_record(&record, record_index)
                    .into_iter()
                    .map(|text| {
                        let trimmed = text.trim();
                        if trimmed.is_empty() {
                            FieldValue::Empty
                        } else {
                            FieldValue::Text(trimmed.to_string())
                        }
                    })
                    .collect();
                rows.push(values);
            }
            Err(e) => return Err(map_csv_read_error(e)),
        }
    }

    Ok(ImportTable { columns, rows })
}

fn decode_record(record: &ByteRecord, record_index: u64) -> Vec<String> {
    record
        .iter()
        .enumerate()
        .map(|(col, field)| decode_field(field, record_index, col).into_owned())
        .collect()
}

/// Decode a raw CSV field as UTF-8, falling back to Windows-1252.
///
/// A UTF-8 BOM at the very start of the file (common in Excel-exported
/// CSVs) is skipped.
fn decode_field(field: &[u8], record_index: u64, column: usize) -> Cow<'_, str> {
    let field = if record_index == 1 && column == 0 && field.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &field[3..]
    } else {
        field
    };

    match std::str::from_utf8(field) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let (cow, _, _) = WINDOWS_1252.decode(field);
            Cow::Owned(cow.into_owned())
        }
    }
}

fn map_csv_read_error(err: csv::Error) -> ReadError {
    let reason = err.to_string();
    let record = err
        .position()
        .map(|p| p.record())
        .filter(|r| *r > 0)
        .unwrap_or(0);
    match err.into_kind() {
        csv::ErrorKind::Io(e) => ReadError::Io(e),
        _ => ReadError::Parse { record, reason },
    }
}
