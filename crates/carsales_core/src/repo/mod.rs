//! Storage backends for the sales table.
//!
//! # Responsibility
//! - Define the whole-table `load`/`save` contract shared by all backends.
//! - Map backend-specific failures onto one storage error taxonomy.
//! - Resolve tabular headers (including legacy spellings) to record fields.
//!
//! # Invariants
//! - `save` replaces the entire stored table; there are no partial updates.
//! - `load` after a successful `save` returns an equal table, order preserved.
//! - Backends hold no cached table between calls.

use crate::model::record::{Record, RecordField, COLUMN_HEADERS};
use crate::model::table::Table;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub mod csv_repo;
mod local_file;
pub mod sheets_repo;
pub mod sqlite_repo;
pub mod xlsx_repo;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure talking to a storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// Backend could not be reached or is closed.
    Unreachable(String),
    /// Backend refused access: file locked or open elsewhere, auth or quota
    /// rejection.
    PermissionDenied(String),
    /// Stored data could not be decoded as a sales table.
    Malformed(String),
}

impl StorageError {
    /// Classifies an I/O error raised while touching `context`.
    pub fn from_io(context: &str, err: &io::Error) -> Self {
        let message = format!("{context}: {err}");
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(message),
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                Self::Malformed(message)
            }
            _ => Self::Unreachable(message),
        }
    }

    /// Short stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(message) => write!(f, "storage unreachable: {message}"),
            Self::PermissionDenied(message) => write!(f, "storage permission denied: {message}"),
            Self::Malformed(message) => write!(f, "malformed stored data: {message}"),
        }
    }
}

impl Error for StorageError {}

/// Whole-table persistence contract.
///
/// Implementations are explicit handles: construct with the backend's
/// `open`, release with [`RecordBackend::close`]. Calls after `close` fail
/// with [`StorageError::Unreachable`].
pub trait RecordBackend {
    /// Reads the full table. Missing file-backed storage yields an empty table.
    fn load(&self) -> StorageResult<Table>;
    /// Replaces the stored table with `table`.
    fn save(&self, table: &Table) -> StorageResult<()>;
    /// Human-readable location for logs and messages.
    fn describe(&self) -> String;
    /// Releases backend resources.
    fn close(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

impl<B: RecordBackend + ?Sized> RecordBackend for Box<B> {
    fn load(&self) -> StorageResult<Table> {
        (**self).load()
    }

    fn save(&self, table: &Table) -> StorageResult<()> {
        (**self).save(table)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn close(&mut self) -> StorageResult<()> {
        (**self).close()
    }
}

/// Header row written by every tabular backend.
pub fn header_row() -> Vec<String> {
    COLUMN_HEADERS.iter().map(|header| header.to_string()).collect()
}

/// Maps record fields to cell positions of a stored header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    positions: [usize; 5],
}

impl ColumnMap {
    /// Resolves a header row; unknown extra columns are ignored.
    ///
    /// # Errors
    /// - `Malformed` when a record column is missing or appears twice.
    pub(crate) fn resolve<S: AsRef<str>>(headers: &[S]) -> StorageResult<Self> {
        let mut positions: [Option<usize>; 5] = [None; 5];

        for (position, header) in headers.iter().enumerate() {
            let Some(field) = RecordField::from_header(header.as_ref()) else {
                continue;
            };
            let slot = &mut positions[field.column()];
            if slot.is_some() {
                return Err(StorageError::Malformed(format!(
                    "column `{field}` appears more than once"
                )));
            }
            *slot = Some(position);
        }

        let mut resolved = [0usize; 5];
        for field in RecordField::ALL {
            resolved[field.column()] = positions[field.column()].ok_or_else(|| {
                StorageError::Malformed(format!("missing column `{field}`"))
            })?;
        }

        Ok(Self {
            positions: resolved,
        })
    }

    /// Builds a record from one data row; short rows read as empty cells.
    pub(crate) fn record<S: AsRef<str>>(&self, cells: &[S]) -> Record {
        let cell = |field: RecordField| {
            cells
                .get(self.positions[field.column()])
                .map(|value| value.as_ref().to_string())
                .unwrap_or_default()
        };

        Record {
            customer_name: cell(RecordField::CustomerName),
            car_model: cell(RecordField::CarModel),
            chassis_number: cell(RecordField::ChassisNumber),
            sold_for: cell(RecordField::SoldFor),
            selling_date: cell(RecordField::SellingDate),
        }
    }
}

/// Whether a stored row carries no data at all.
pub(crate) fn is_blank_row<S: AsRef<str>>(cells: &[S]) -> bool {
    cells.iter().all(|cell| cell.as_ref().trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{is_blank_row, ColumnMap, StorageError};
    use std::io;

    #[test]
    fn column_map_follows_header_order() {
        let map = ColumnMap::resolve(&[
            "Selling Date",
            "Chasis Number",
            "Notes",
            "Customer Name",
            "Sold For (¥)",
            "Car Name/Model",
        ])
        .unwrap();
        let record = map.record(&["2023-01-01", "CH001", "x", "Alice", "5000", "Civic"]);
        assert_eq!(record.customer_name, "Alice");
        assert_eq!(record.chassis_number, "CH001");
        assert_eq!(record.sold_for, "5000");
    }

    #[test]
    fn short_rows_pad_with_empty_cells() {
        let map = ColumnMap::resolve(super::header_row().as_slice()).unwrap();
        let record = map.record(&["Alice", "Civic", "CH001"]);
        assert_eq!(record.sold_for, "");
        assert_eq!(record.selling_date, "");
    }

    #[test]
    fn column_map_rejects_missing_and_duplicate_columns() {
        let missing = ColumnMap::resolve(&["Customer Name", "Chassis Number"]).unwrap_err();
        assert!(matches!(missing, StorageError::Malformed(_)));

        let duplicate = ColumnMap::resolve(&[
            "Customer Name",
            "Car Name/Model",
            "Chassis Number",
            "Chasis Number",
            "Sold For",
            "Selling Date",
        ])
        .unwrap_err();
        assert!(duplicate.to_string().contains("more than once"));
    }

    #[test]
    fn io_permission_denied_maps_to_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "locked");
        assert!(matches!(
            StorageError::from_io("sales.csv", &err),
            StorageError::PermissionDenied(_)
        ));
        assert!(is_blank_row(&["", "  "]));
    }
}
