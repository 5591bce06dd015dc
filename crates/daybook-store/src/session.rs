use std::fmt;

use serde::Serialize;
use thiserror::Error;

use daybook_io::{TabularStore, WriteError};
use daybook_model::{
    decode_note, ConformError, FieldValue, ImportError, ImportTable, NoteParts, Schema, Table,
};

/// Errors surfaced by session operations.
///
/// All of these are recoverable at the caller's boundary: re-render after a
/// stale index, retry after a failed flush, fix the upload after a schema
/// mismatch. None of them leave the in-memory table partially mutated.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row {index} is out of range (table has {len} rows)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("import is missing required columns: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },
    #[error(transparent)]
    InvalidCandidate(#[from] ConformError),
    #[error("failed to persist ledger: {0}")]
    Io(#[from] WriteError),
}

/// How a session came to start with an empty table.
///
/// Reported to the caller so nothing degrades silently; the caller decides
/// whether to surface it as info (new ledger) or a warning (unreadable
/// file).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenNotice {
    /// The backing file does not exist yet.
    CreatedNew,
    /// The backing file exists but could not be read; the session starts
    /// empty and the first successful flush replaces it.
    RecoveredUnreadable { detail: String },
}

impl fmt::Display for OpenNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenNotice::CreatedNew => f.write_str("no existing ledger file, starting empty"),
            OpenNotice::RecoveredUnreadable { detail } => {
                write!(f, "ledger file could not be read ({detail}), starting empty")
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitKind {
    Inserted,
    Updated,
}

/// Result of a successful submit: the new row count and whether the
/// candidate was appended or replaced an edited row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub rows: usize,
    pub kind: SubmitKind,
}

/// Result of a successful merge-import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Rows appended from the import before deduplication.
    pub appended: usize,
    /// Duplicate rows removed by the dedupe key, first occurrence kept.
    pub dropped: usize,
    /// Row count after the merge.
    pub rows: usize,
}

/// Snapshot of a row handed to the form for pre-fill when editing.
///
/// `fields` carries every field by name in schema order; `note` is the
/// decoded composite note when the schema declares a note field.
#[derive(Clone, Debug, PartialEq)]
pub struct EditDraft {
    pub index: usize,
    pub fields: Vec<(String, FieldValue)>,
    pub note: Option<NoteParts>,
}

/// A single-user ledger session: the table, the edit cursor, and the
/// backing store, kept consistent through every mutation.
///
/// Cursor invariant: always `None` or a valid index into the current table.
/// Structural mutations clear or remap it. Positions handed out to a
/// renderer are stale after any mutating call; callers must re-fetch the
/// table rather than reuse a previous snapshot.
pub struct LedgerSession<S: TabularStore> {
    store: S,
    table: Table,
    cursor: Option<usize>,
}

impl<S: TabularStore> LedgerSession<S> {
    /// Open a session over a store.
    ///
    /// An absent or unreadable backing file degrades to an empty table and
    /// a notice; no error escapes. Files from older schemas load with
    /// missing columns backfilled empty.
    pub fn open(store: S, schema: Schema) -> (Self, Option<OpenNotice>) {
        let (table, notice) = match store.read(&schema) {
            Ok(Some(table)) => (table, None),
            Ok(None) => (Table::new(schema), Some(OpenNotice::CreatedNew)),
            Err(err) => (
                Table::new(schema),
                Some(OpenNotice::RecoveredUnreadable {
                    detail: err.to_string(),
                }),
            ),
        };
        (
            Self {
                store,
                table,
                cursor: None,
            },
            notice,
        )
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// The backing store handle.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn schema(&self) -> &Schema {
        self.table.schema()
    }

    /// The row currently being edited, if any.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Start editing the row at `index` and return its draft for form
    /// pre-fill. Purely a view-state change; the table is untouched.
    ///
    /// Replaces any prior selection. Fails on a stale index; the caller
    /// should re-render and retry.
    pub fn begin_edit(&mut self, index: usize) -> Result<EditDraft, StoreError> {
        let row = self.table.row(index).ok_or(StoreError::IndexOutOfRange {
            index,
            len: self.table.len(),
        })?;

        let schema = self.table.schema();
        let fields: Vec<(String, FieldValue)> = schema
            .fields()
            .iter()
            .zip(row.values())
            .map(|(field, value)| (field.name.clone(), value.clone()))
            .collect();
        let note = schema.note_field_index().map(|idx| {
            decode_note(
                &row.values()[idx].to_display_string(),
                schema.note_categories(),
            )
        });

        self.cursor = Some(index);
        Ok(EditDraft {
            index,
            fields,
            note,
        })
    }

    /// Discard the current edit selection without mutating anything.
    pub fn cancel_edit(&mut self) {
        self.cursor = None;
    }

    /// Submit a candidate row from the form.
    ///
    /// With an active edit cursor this replaces the edited row and clears
    /// the cursor; otherwise it appends. Either way the table is then
    /// re-sorted by date, renumbered, and flushed. On flush failure both
    /// table and cursor roll back to their pre-submit state.
    pub fn submit(
        &mut self,
        candidate: &[(String, FieldValue)],
    ) -> Result<SubmitOutcome, StoreError> {
        let row = self.table.schema().conform(candidate)?;

        let snapshot = self.table.clone();
        let prev_cursor = self.cursor;

        let kind = match self.cursor.take() {
            Some(index) => {
                self.table.replace_row(index, row);
                SubmitKind::Updated
            }
            None => {
                self.table.push_row(row);
                SubmitKind::Inserted
            }
        };
        self.table.sort_by_date();
        self.table.renumber_ordinal();
        self.flush(snapshot, prev_cursor)?;

        Ok(SubmitOutcome {
            rows: self.table.len(),
            kind,
        })
    }

    /// Delete the row at `index`; rows after it shift down one position.
    ///
    /// The cursor follows the same logical row: cleared when it pointed at
    /// the deleted row, decremented when it pointed past it. Returns the
    /// new row count.
    pub fn delete(&mut self, index: usize) -> Result<usize, StoreError> {
        if index >= self.table.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.table.len(),
            });
        }

        let snapshot = self.table.clone();
        let prev_cursor = self.cursor;

        self.table.remove_row(index);
        self.cursor = match self.cursor {
            Some(c) if c == index => None,
            Some(c) if c > index => Some(c - 1),
            other => other,
        };
        self.table.renumber_ordinal();
        self.flush(snapshot, prev_cursor)?;

        Ok(self.table.len())
    }

    /// Merge an uploaded table into the ledger.
    ///
    /// The import's columns must cover every schema field or the whole
    /// operation is rejected with no mutation. Accepted rows are projected
    /// down to the schema, appended, deduplicated by the schema's key
    /// (first occurrence in concatenated order wins), then sorted,
    /// renumbered, and flushed. A successful merge clears the cursor:
    /// positions change wholesale.
    pub fn merge_import(&mut self, incoming: &ImportTable) -> Result<MergeOutcome, StoreError> {
        let rows = incoming
            .project(self.table.schema())
            .map_err(|ImportError::MissingColumns { missing }| StoreError::SchemaMismatch {
                missing,
            })?;

        let snapshot = self.table.clone();
        let prev_cursor = self.cursor;

        let appended = rows.len();
        for row in rows {
            self.table.push_row(row);
        }
        let dropped = self.table.dedupe_keep_first();
        self.table.sort_by_date();
        self.table.renumber_ordinal();
        self.cursor = None;
        self.flush(snapshot, prev_cursor)?;

        Ok(MergeOutcome {
            appended,
            dropped,
            rows: self.table.len(),
        })
    }

    /// Write the whole table out to another store (export).
    pub fn export_to<T: TabularStore>(&self, target: &mut T) -> Result<(), StoreError> {
        target.write(&self.table)?;
        Ok(())
    }

    fn flush(&mut self, snapshot: Table, prev_cursor: Option<usize>) -> Result<(), StoreError> {
        match self.store.write(&self.table) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.table = snapshot;
                self.cursor = prev_cursor;
                Err(StoreError::Io(err))
            }
        }
    }
}
