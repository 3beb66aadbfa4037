//! Excel workbook backend.
//!
//! # Responsibility
//! - Read and write the sales table on the first worksheet of an `.xlsx`
//!   workbook, the format of `car_sales_data.xlsx`.
//!
//! # Invariants
//! - A missing or zero-length file loads as an empty table.
//! - Every cell is read back as text; whole numbers stored as numeric cells
//!   read as `5000`, not `5000.0`, and date cells read as `YYYY-MM-DD`.
//! - Every cell is written as a string cell.
//! - Saves replace the workbook through a temporary sibling file.

use crate::model::table::Table;
use crate::repo::local_file::{checked_data_path, closed, io_error, open_existing, replace_file};
use crate::repo::{header_row, is_blank_row, ColumnMap, RecordBackend, StorageError, StorageResult};
use calamine::{Data, Reader, Xlsx};
use log::{error, info, warn};
use rust_xlsxwriter::Workbook;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const SHEET_NAME: &str = "Sheet1";

/// Sales table stored on the first worksheet of an Excel workbook.
#[derive(Debug, Clone)]
pub struct XlsxFileBackend {
    path: Option<PathBuf>,
}

impl XlsxFileBackend {
    /// Opens a handle on `path`. The workbook itself is created by the first save.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = checked_data_path("xlsx", path.as_ref())?;
        info!(
            "event=backend_open module=xlsx_repo status=ok path={}",
            path.display()
        );
        Ok(Self { path: Some(path) })
    }

    fn path(&self) -> StorageResult<&Path> {
        self.path.as_deref().ok_or_else(|| closed("xlsx"))
    }

    fn read_table(path: &Path) -> StorageResult<Table> {
        let Some(file) = open_existing(path)? else {
            warn!(
                "event=table_load module=xlsx_repo status=ok path={} rows=0 note=file_missing_or_empty",
                path.display()
            );
            return Ok(Table::new());
        };

        let mut workbook =
            Xlsx::new(BufReader::new(file)).map_err(|err| workbook_error(path, err))?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|err| workbook_error(path, err))?,
            None => return Ok(Table::new()),
        };

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
        let Some(headers) = rows.next() else {
            return Ok(Table::new());
        };
        let columns = ColumnMap::resolve(headers.as_slice())?;

        let mut table = Vec::new();
        for cells in rows {
            if is_blank_row(cells.as_slice()) {
                continue;
            }
            table.push(columns.record(cells.as_slice()));
        }
        Ok(Table::from(table))
    }

    fn write_table(path: &Path, table: &Table) -> StorageResult<()> {
        let bytes = encode_workbook(table)
            .map_err(|err| StorageError::Malformed(format!("{}: {err}", path.display())))?;
        replace_file(path, |mut file| {
            file.write_all(&bytes).map_err(|err| io_error(path, &err))
        })
    }
}

fn encode_workbook(table: &Table) -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (column, header) in header_row().iter().enumerate() {
        worksheet.write_string(0, column as u16, header)?;
    }
    for (index, record) in table.iter().enumerate() {
        let row = index as u32 + 1;
        for (column, value) in record.to_row().iter().enumerate() {
            worksheet.write_string(row, column as u16, value)?;
        }
    }

    workbook.save_to_buffer()
}

fn workbook_error(path: &Path, err: calamine::XlsxError) -> StorageError {
    match err {
        calamine::XlsxError::Io(io_err) => io_error(path, &io_err),
        other => StorageError::Malformed(format!("{}: {other}", path.display())),
    }
}

/// Renders one cell as the text a user would see in the sheet.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => {
            value.clone()
        }
        Data::Int(value) => value.to_string(),
        Data::Float(value) => float_text(*value),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d").to_string(),
            None => float_text(value.as_f64()),
        },
        Data::Error(value) => value.to_string(),
    }
}

fn float_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl RecordBackend for XlsxFileBackend {
    fn load(&self) -> StorageResult<Table> {
        let started_at = Instant::now();
        let path = self.path()?;
        let result = Self::read_table(path);

        match &result {
            Ok(table) => info!(
                "event=table_load module=xlsx_repo status=ok path={} rows={} duration_ms={}",
                path.display(),
                table.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_load module=xlsx_repo status=error path={} error_code={} error={}",
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
                "event=table_save module=xlsx_repo status=ok path={} rows={} duration_ms={}",
                path.display(),
                table.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_save module=xlsx_repo status=error path={} error_code={} error={}",
                path.display(),
                err.code(),
                err
            ),
        }
        result
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("xlsx:{}", path.display()),
            None => "xlsx:closed".to_string(),
        }
    }

    fn close(&mut self) -> StorageResult<()> {
        if let Some(path) = self.path.take() {
            info!(
                "event=backend_close module=xlsx_repo status=ok path={}",
                path.display()
            );
        }
        Ok(())
    }
}
