//! Core record store for car-sale transactions.
//! Owns the record model, table rules, storage backends and use-case service.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{BackendKind, ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{Record, RecordField, RecordInput, ValidationError, COLUMN_HEADERS};
pub use model::table::{SearchField, Table};
pub use repo::csv_repo::CsvFileBackend;
pub use repo::sheets_repo::{HttpSheetsApi, SheetValuesApi, SheetsBackend};
pub use repo::sqlite_repo::SqliteBackend;
pub use repo::xlsx_repo::XlsxFileBackend;
pub use repo::{RecordBackend, StorageError, StorageResult};
pub use service::record_service::{RecordMatch, RecordService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
