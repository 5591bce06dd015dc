use daybook_model::{Schema, Table};

use crate::{ReadError, TabularStore, WriteError};

/// In-memory store for tests and ephemeral sessions.
///
/// Supports injecting a one-shot write failure so callers can exercise
/// their rollback paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    table: Option<Table>,
    fail_next_write: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: Table) -> Self {
        Self {
            table: Some(table),
            fail_next_write: false,
        }
    }

    /// Make the next `write` fail with an I/O error, leaving the stored
    /// table untouched.
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }

    /// The last table successfully written, if any.
    pub fn stored(&self) -> Option<&Table> {
        self.table.as_ref()
    }
}

impl TabularStore for MemoryStore {
    fn read(&self, _schema: &Schema) -> Result<Option<Table>, ReadError> {
        Ok(self.table.clone())
    }

    fn write(&mut self, table: &Table) -> Result<(), WriteError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(WriteError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        self.table = Some(table.clone());
        Ok(())
    }
}
