//! `daybook-model` defines the core in-memory ledger data structures.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the record store (edit-state machine, merge, sort)
//! - the CSV import/export layer
//! - CLI and other boundaries via `serde` (JSON-safe schema)

mod date;
pub mod import;
mod note;
mod schema;
mod table;
mod value;

pub use date::{format_date, parse_date, DateOrder};
pub use import::{ImportError, ImportTable};
pub use note::{decode_note, encode_note, NoteParts, DEFAULT_NOTE_CATEGORIES, NOTE_SEPARATOR};
pub use schema::{ConformError, FieldDef, FieldKind, Schema, SchemaError};
pub use table::{Row, Table};
pub use value::FieldValue;
