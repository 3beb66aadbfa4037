//! Sales record use-case service.
//!
//! # Responsibility
//! - Run every use case as load → mutate in memory → save.
//! - Translate table and storage failures into one service error.
//!
//! # Invariants
//! - Every call reloads the full table; nothing is cached between calls.
//! - Validation failures and not-found deletes never reach `save`.
//! - No locking: two sessions racing load → save lose the earlier write, and
//!   an index taken from an older load may point at a different record.

use crate::model::record::{Record, RecordInput, ValidationError};
use crate::model::table::{SearchField, Table};
use crate::repo::{RecordBackend, StorageError, StorageResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for sales record use cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected; storage untouched.
    Validation(ValidationError),
    /// Backend failure during load or save.
    Storage(StorageError),
    /// No record carries the requested chassis number.
    NotFound(String),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::NotFound(chassis) => {
                write!(f, "no customer found with chassis number `{chassis}`")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// One lookup hit with its position in the table it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMatch {
    pub index: usize,
    pub record: Record,
}

/// Use-case facade over one backend handle.
pub struct RecordService<B: RecordBackend> {
    backend: B,
}

impl<B: RecordBackend> RecordService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads every record, in stored order.
    pub fn list_all(&self) -> ServiceResult<Table> {
        Ok(self.backend.load()?)
    }

    /// Finds records by customer name (substring) or chassis (exact).
    ///
    /// A blank query returns no matches without touching storage.
    pub fn lookup(&self, field: SearchField, query: &str) -> ServiceResult<Vec<RecordMatch>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let table = self.backend.load()?;
        let matches: Vec<RecordMatch> = table
            .find(field, query)
            .into_iter()
            .map(|(index, record)| RecordMatch {
                index,
                record: record.clone(),
            })
            .collect();
        info!(
            "event=record_lookup module=service status=ok field={:?} matches={}",
            field,
            matches.len()
        );
        Ok(matches)
    }

    /// Validates and appends a record, then saves.
    pub fn add_record(&self, input: &RecordInput) -> ServiceResult<Record> {
        let mut table = self.backend.load()?;
        let record = match table.add(input) {
            Ok(record) => record.clone(),
            Err(err) => return Err(self.rejected("record_add", err)),
        };
        self.backend.save(&table)?;

        info!(
            "event=record_add module=service status=ok rows={}",
            table.len()
        );
        Ok(record)
    }

    /// Returns the records a delete of `chassis` would remove.
    pub fn preview_delete(&self, chassis: &str) -> ServiceResult<Vec<Record>> {
        let table = self.backend.load()?;
        Ok(table
            .find(SearchField::ChassisNumber, chassis)
            .into_iter()
            .map(|(_, record)| record.clone())
            .collect())
    }

    /// Removes the record with `chassis`, then saves.
    ///
    /// # Errors
    /// - `NotFound` when nothing matches; storage is not written.
    pub fn delete_record(&self, chassis: &str) -> ServiceResult<Vec<Record>> {
        let mut table = self.backend.load()?;
        let removed = table.remove(chassis);
        if removed.is_empty() {
            warn!("event=record_delete module=service status=not_found");
            return Err(ServiceError::NotFound(chassis.trim().to_string()));
        }
        self.backend.save(&table)?;

        info!(
            "event=record_delete module=service status=ok removed={} rows={}",
            removed.len(),
            table.len()
        );
        Ok(removed)
    }

    /// Overwrites the record at `index` of a freshly loaded table, then saves.
    pub fn edit_record(&self, index: usize, input: &RecordInput) -> ServiceResult<Record> {
        let mut table = self.backend.load()?;
        self.apply_edit(&mut table, index, input)
    }

    /// Overwrites the record currently holding `chassis`, then saves.
    ///
    /// Resolving the chassis and editing happen against the same load, which
    /// avoids the stale-index hazard of [`RecordService::edit_record`].
    pub fn edit_by_chassis(&self, chassis: &str, input: &RecordInput) -> ServiceResult<Record> {
        let mut table = self.backend.load()?;
        let Some(index) = table.position_of(chassis) else {
            return Err(ServiceError::NotFound(chassis.trim().to_string()));
        };
        self.apply_edit(&mut table, index, input)
    }

    /// Releases the backend handle.
    pub fn close(mut self) -> StorageResult<()> {
        self.backend.close()
    }

    fn apply_edit(
        &self,
        table: &mut Table,
        index: usize,
        input: &RecordInput,
    ) -> ServiceResult<Record> {
        let record = match table.update(index, input) {
            Ok(record) => record.clone(),
            Err(err) => return Err(self.rejected("record_edit", err)),
        };
        self.backend.save(table)?;

        info!(
            "event=record_edit module=service status=ok index={}",
            index
        );
        Ok(record)
    }

    fn rejected(&self, event: &str, err: ValidationError) -> ServiceError {
        warn!(
            "event={} module=service status=rejected reason={}",
            event,
            validation_code(&err)
        );
        ServiceError::Validation(err)
    }
}

fn validation_code(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::MissingField(_) => "missing_field",
        ValidationError::DuplicateChassis(_) => "duplicate_chassis",
        ValidationError::InvalidSoldFor(_) => "invalid_sold_for",
        ValidationError::InvalidDate(_) => "invalid_date",
        ValidationError::NoSuchRecord(_) => "no_such_record",
    }
}
