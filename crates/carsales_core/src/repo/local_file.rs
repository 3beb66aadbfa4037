//! Shared plumbing for single-file spreadsheet backends.
//!
//! # Invariants
//! - Replacing a file goes through a temporary sibling that is synced and
//!   then renamed over the target.

use crate::repo::{StorageError, StorageResult};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Checks that `path` can name a data file.
pub(crate) fn checked_data_path(kind: &str, path: &Path) -> StorageResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(StorageError::Unreachable(format!(
            "{kind} backend path cannot be empty"
        )));
    }
    if path.is_dir() {
        return Err(StorageError::Unreachable(format!(
            "`{}` is a directory",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Opens `path` for reading; `None` when it does not exist or is empty.
pub(crate) fn open_existing(path: &Path) -> StorageResult<Option<File>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_error(path, &err)),
    };
    let len = file.metadata().map_err(|err| io_error(path, &err))?.len();
    Ok((len > 0).then_some(file))
}

/// Writes a new version of `path` through `write` and swaps it in.
pub(crate) fn replace_file(
    path: &Path,
    write: impl FnOnce(&File) -> StorageResult<()>,
) -> StorageResult<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let temp = NamedTempFile::new_in(&directory)
        .map_err(|err| io_error(&directory, &err))?;

    write(temp.as_file())?;
    temp.as_file()
        .sync_all()
        .map_err(|err| io_error(path, &err))?;

    temp.persist(path).map_err(|err| io_error(path, &err.error))?;
    Ok(())
}

pub(crate) fn io_error(path: &Path, err: &io::Error) -> StorageError {
    StorageError::from_io(&path.display().to_string(), err)
}

pub(crate) fn closed(kind: &str) -> StorageError {
    StorageError::Unreachable(format!("{kind} backend is closed"))
}
