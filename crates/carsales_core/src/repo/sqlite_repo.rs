//! SQLite file backend.
//!
//! # Responsibility
//! - Persist the sales table in an embedded database file.
//!
//! # Invariants
//! - `position` preserves table order across save/load.
//! - A save replaces all rows inside one transaction; a failed save leaves the
//!   previous table intact.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::record::Record;
use crate::model::table::Table;
use crate::repo::{RecordBackend, StorageError, StorageResult};
use log::{error, info};
use rusqlite::{params, Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Instant;

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => classify_sqlite_error(err),
            other @ DbError::UnsupportedSchemaVersion { .. } => Self::Malformed(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        classify_sqlite_error(value)
    }
}

/// Sales table stored in a SQLite database file.
pub struct SqliteBackend {
    conn: Option<Connection>,
    location: PathBuf,
}

impl SqliteBackend {
    /// Opens or creates the database at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let location = path.as_ref().to_path_buf();
        let conn = open_db(&location)?;
        Ok(Self {
            conn: Some(conn),
            location,
        })
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self {
            conn: Some(open_db_in_memory()?),
            location: PathBuf::from(":memory:"),
        })
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or_else(|| {
            StorageError::Unreachable(format!(
                "sqlite backend `{}` is closed",
                self.location.display()
            ))
        })
    }

    fn read_table(&self) -> StorageResult<Table> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT customer_name, car_model, chassis_number, sold_for, selling_date
             FROM sales
             ORDER BY position ASC;",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Record {
                customer_name: row.get(0)?,
                car_model: row.get(1)?,
                chassis_number: row.get(2)?,
                sold_for: row.get(3)?,
                selling_date: row.get(4)?,
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(Table::from(records))
    }

    fn write_table(&self, table: &Table) -> StorageResult<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM sales;", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO sales (
                    position,
                    customer_name,
                    car_model,
                    chassis_number,
                    sold_for,
                    selling_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            )?;
            for (position, record) in table.iter().enumerate() {
                insert.execute(params![
                    position as i64,
                    record.customer_name.as_str(),
                    record.car_model.as_str(),
                    record.chassis_number.as_str(),
                    record.sold_for.as_str(),
                    record.selling_date.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl RecordBackend for SqliteBackend {
    fn load(&self) -> StorageResult<Table> {
        let started_at = Instant::now();
        let result = self.read_table();
        match &result {
            Ok(table) => info!(
                "event=table_load module=sqlite_repo status=ok path={} rows={} duration_ms={}",
                self.location.display(),
                table.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_load module=sqlite_repo status=error path={} error_code={} error={}",
                self.location.display(),
                err.code(),
                err
            ),
        }
        result
    }

    fn save(&self, table: &Table) -> StorageResult<()> {
        let started_at = Instant::now();
        let result = self.write_table(table);
        match &result {
            Ok(()) => info!(
                "event=table_save module=sqlite_repo status=ok path={} rows={} duration_ms={}",
                self.location.display(),
                table.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_save module=sqlite_repo status=error path={} error_code={} error={}",
                self.location.display(),
                err.code(),
                err
            ),
        }
        result
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.location.display())
    }

    fn close(&mut self) -> StorageResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, err)| classify_sqlite_error(err))?;
        info!(
            "event=backend_close module=sqlite_repo status=ok path={}",
            self.location.display()
        );
        Ok(())
    }
}

fn classify_sqlite_error(err: rusqlite::Error) -> StorageError {
    let message = err.to_string();
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied => StorageError::PermissionDenied(message),
            ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt => {
                StorageError::Malformed(message)
            }
            _ => StorageError::Unreachable(message),
        },
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::Utf8Error(_) => StorageError::Malformed(message),
        _ => StorageError::Unreachable(message),
    }
}

#[cfg(test)]
mod tests {
    use super::classify_sqlite_error;
    use crate::repo::StorageError;
    use rusqlite::ffi;

    #[test]
    fn busy_database_is_permission_denied() {
        let err = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None);
        assert!(matches!(
            classify_sqlite_error(err),
            StorageError::PermissionDenied(_)
        ));
    }

    #[test]
    fn not_a_database_is_malformed() {
        let err = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_NOTADB), None);
        assert!(matches!(
            classify_sqlite_error(err),
            StorageError::Malformed(_)
        ));
    }
}
