//! `daybook-io` owns persistence for ledger tables.
//!
//! The store contract is deliberately small: a table either reads back in
//! full, reads as "not found", or fails; a write either lands atomically or
//! leaves the previous file intact. The CSV codec is the shipped
//! implementation; [`MemoryStore`] backs tests.

mod atomic;
mod csv_file;
mod memory;

pub use csv_file::{read_import_file, CsvLedger};
pub use memory::MemoryStore;

use daybook_model::{Schema, Table};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("csv parse error at record {record}: {reason}")]
    Parse { record: u64, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("csv encode error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A whole-table persistence backend.
///
/// `read` returns `Ok(None)` when the backing source does not exist yet;
/// callers decide the degrade-to-empty policy. `write` replaces the entire
/// stored table or fails without partial effects.
pub trait TabularStore {
    fn read(&self, schema: &Schema) -> Result<Option<Table>, ReadError>;
    fn write(&mut self, table: &Table) -> Result<(), WriteError>;
}
