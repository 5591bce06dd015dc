//! Atomic file replacement: write to a temp file in the destination
//! directory, flush + sync, then rename into place. A failed write never
//! truncates or corrupts the previous file.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::WriteError;

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` returns `Some("")` for bare relative file names like
    // `daybook.csv`. Treat that as the current directory so callers can use
    // relative paths without prepending `./`.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Atomically replace `dest` with whatever `write_fn` produces.
///
/// The temp file lives in the same directory as `dest` so the final rename
/// never crosses a filesystem boundary.
pub fn atomic_write(
    dest: &Path,
    write_fn: impl FnOnce(&mut File) -> Result<(), WriteError>,
) -> Result<(), WriteError> {
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write_fn(tmp.as_file_mut())?;

    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    let tmp_path = tmp.into_temp_path();
    tmp_path.persist(dest).map_err(|e| WriteError::Io(e.error))?;
    Ok(())
}
