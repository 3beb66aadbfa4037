//! CSV file backend.
//!
//! # Responsibility
//! - Persist the sales table as a spreadsheet-compatible CSV file.
//!
//! # Invariants
//! - A missing or zero-length file loads as an empty table.
//! - Saves go to a temporary file in the target directory and are renamed
//!   over the target, so readers see either the old or the new table.
//! - After `close`, `load` and `save` fail with `Unreachable`.

use crate::model::table::Table;
use crate::repo::local_file::{checked_data_path, closed, io_error, open_existing, replace_file};
use crate::repo::{header_row, is_blank_row, ColumnMap, RecordBackend, StorageError, StorageResult};
use log::{error, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Sales table stored in a single CSV file.
#[derive(Debug, Clone)]
pub struct CsvFileBackend {
    path: Option<PathBuf>,
}

impl CsvFileBackend {
    /// Opens a handle on `path`. The file itself is created by the first save.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = checked_data_path("csv", path.as_ref())?;
        info!(
            "event=backend_open module=csv_repo status=ok path={}",
            path.display()
        );
        Ok(Self { path: Some(path) })
    }

    fn path(&self) -> StorageResult<&Path> {
        self.path.as_deref().ok_or_else(|| closed("csv"))
    }

    fn read_table(path: &Path, file: File) -> StorageResult<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(file);
        let mut rows = reader.records();

        let headers = match rows.next() {
            Some(row) => row.map_err(|err| csv_error(path, err))?,
            None => return Ok(Table::new()),
        };
        let header_cells: Vec<&str> = headers.iter().collect();
        let columns = ColumnMap::resolve(header_cells.as_slice())?;

        let mut table = Vec::new();
        for row in rows {
            let row = row.map_err(|err| csv_error(path, err))?;
            let cells: Vec<&str> = row.iter().collect();
            if is_blank_row(cells.as_slice()) {
                continue;
            }
            table.push(columns.record(cells.as_slice()));
        }

        Ok(Table::from(table))
    }

    fn write_table(path: &Path, table: &Table) -> StorageResult<()> {
        replace_file(path, |file| {
            let mut writer = csv::Writer::from_writer(BufWriter::new(file));
            writer
                .write_record(header_row())
                .map_err(|err| csv_error(path, err))?;
            for record in table {
                writer
                    .write_record(record.to_row())
                    .map_err(|err| csv_error(path, err))?;
            }
            let mut buffered = writer
                .into_inner()
                .map_err(|err| io_error(path, err.error()))?;
            buffered.flush().map_err(|err| io_error(path, &err))
        })
    }
}

fn csv_error(path: &Path, err: csv::Error) -> StorageError {
    match err.kind() {
        csv::ErrorKind::Io(io_err) => io_error(path, io_err),
        _ => StorageError::Malformed(format!("{}: {err}", path.display())),
    }
}

impl RecordBackend for CsvFileBackend {
    fn load(&self) -> StorageResult<Table> {
        let started_at = Instant::now();
        let path = self.path()?;
        let result = open_existing(path).and_then(|file| match file {
            Some(file) => Self::read_table(path, file),
            None => {
                warn!(
                    "event=table_load module=csv_repo status=ok path={} rows=0 note=file_missing_or_empty",
                    path.display()
                );
                Ok(Table::new())
            }
        });

        match &result {
            Ok(table) => info!(
                "event=table_load module=csv_repo status=ok path={} rows={} duration_ms={}",
                path.display(),
                table.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_load module=csv_repo status=error path={} error_code={} error={}",
                path.display(),
                err.code(),
                err
            ),
        }
        result
    }

    fn save(&self, table: &Table) -> StorageResult<()> {
        let started_at = Instant::now();
        let path = self.path()?;
        let result = Self::write_table(path, table);

        match &result {
            Ok(()) => info!(
                "event=table_save module=csv_repo status=ok path={} rows={} duration_ms={}",
                path.display(),
                table.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_save module=csv_repo status=error path={} error_code={} error={}",
                path.display(),
                err.code(),
                err
            ),
        }
        result
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("csv:{}", path.display()),
            None => "csv:closed".to_string(),
        }
    }

    fn close(&mut self) -> StorageResult<()> {
        if let Some(path) = self.path.take() {
            info!(
                "event=backend_close module=csv_repo status=ok path={}",
                path.display()
            );
        }
        Ok(())
    }
}
