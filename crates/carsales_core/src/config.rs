//! Store configuration from environment variables.
//!
//! | Env Var                   | Required          | Default                          |
//! |---------------------------|-------------------|----------------------------------|
//! | `CARSALES_BACKEND`        | no                | `csv` (`csv`, `xlsx`, `sqlite`, `sheets`) |
//! | `CARSALES_DATA_FILE`      | no                | `car_sales_data.csv` / `.xlsx` / `.sqlite3` |
//! | `CARSALES_SHEET_ID`       | for `sheets`      | --                               |
//! | `CARSALES_SHEETS_TOKEN`   | for `sheets`      | --                               |
//! | `CARSALES_SHEETS_ENDPOINT`| no                | `https://sheets.googleapis.com`  |
//! | `CARSALES_LOG_LEVEL`      | no                | build-mode default               |
//! | `CARSALES_LOG_DIR`        | no                | logging disabled                 |

use crate::logging::default_log_level;
use crate::repo::csv_repo::CsvFileBackend;
use crate::repo::sheets_repo::{SheetsBackend, DEFAULT_SHEETS_ENDPOINT};
use crate::repo::sqlite_repo::SqliteBackend;
use crate::repo::xlsx_repo::XlsxFileBackend;
use crate::repo::{RecordBackend, StorageError, StorageResult};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_BACKEND: &str = "CARSALES_BACKEND";
pub const ENV_DATA_FILE: &str = "CARSALES_DATA_FILE";
pub const ENV_SHEET_ID: &str = "CARSALES_SHEET_ID";
pub const ENV_SHEETS_TOKEN: &str = "CARSALES_SHEETS_TOKEN";
pub const ENV_SHEETS_ENDPOINT: &str = "CARSALES_SHEETS_ENDPOINT";
pub const ENV_LOG_LEVEL: &str = "CARSALES_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CARSALES_LOG_DIR";

const DEFAULT_CSV_FILE: &str = "car_sales_data.csv";
const DEFAULT_XLSX_FILE: &str = "car_sales_data.xlsx";
const DEFAULT_SQLITE_FILE: &str = "car_sales_data.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    Missing(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid value `{value}` for {key}; expected {expected}"),
            Self::Missing(key) => write!(f, "{key} must be set for this backend"),
        }
    }
}

impl Error for ConfigError {}

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Csv,
    Xlsx,
    Sqlite,
    Sheets,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" | "file" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "sqlite" => Ok(Self::Sqlite),
            "sheets" | "cloud" => Ok(Self::Sheets),
            other => Err(ConfigError::InvalidValue {
                key: ENV_BACKEND,
                value: other.to_string(),
                expected: "csv|xlsx|sqlite|sheets",
            }),
        }
    }
}

/// Resolved store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub data_file: Option<PathBuf>,
    pub sheet_id: Option<String>,
    pub sheets_token: Option<String>,
    pub sheets_endpoint: String,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Csv,
            data_file: None,
            sheet_id: None,
            sheets_token: None,
            sheets_endpoint: DEFAULT_SHEETS_ENDPOINT.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(value) = get(ENV_BACKEND) {
            config.backend = value.parse()?;
        }
        config.data_file = get(ENV_DATA_FILE).map(PathBuf::from);
        config.sheet_id = get(ENV_SHEET_ID);
        config.sheets_token = get(ENV_SHEETS_TOKEN);
        if let Some(endpoint) = get(ENV_SHEETS_ENDPOINT) {
            config.sheets_endpoint = endpoint;
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = get(ENV_LOG_DIR).map(PathBuf::from);

        Ok(config)
    }

    /// Checks that the selected backend has what it needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == BackendKind::Sheets {
            if self.sheet_id.is_none() {
                return Err(ConfigError::Missing(ENV_SHEET_ID));
            }
            if self.sheets_token.is_none() {
                return Err(ConfigError::Missing(ENV_SHEETS_TOKEN));
            }
        }
        Ok(())
    }

    /// Data file for file-based backends, falling back to the default name.
    pub fn data_file(&self) -> PathBuf {
        match (&self.data_file, self.backend) {
            (Some(path), _) => path.clone(),
            (None, BackendKind::Xlsx) => PathBuf::from(DEFAULT_XLSX_FILE),
            (None, BackendKind::Sqlite) => PathBuf::from(DEFAULT_SQLITE_FILE),
            (None, _) => PathBuf::from(DEFAULT_CSV_FILE),
        }
    }

    /// Opens the configured backend as a boxed handle.
    pub fn open_backend(&self) -> StorageResult<Box<dyn RecordBackend>> {
        match self.backend {
            BackendKind::Csv => Ok(Box::new(CsvFileBackend::open(self.data_file())?)),
            BackendKind::Xlsx => Ok(Box::new(XlsxFileBackend::open(self.data_file())?)),
            BackendKind::Sqlite => Ok(Box::new(SqliteBackend::open(self.data_file())?)),
            BackendKind::Sheets => {
                let (Some(sheet_id), Some(token)) = (&self.sheet_id, &self.sheets_token) else {
                    return Err(StorageError::Unreachable(
                        "spreadsheet id and access token are required".to_string(),
                    ));
                };
                Ok(Box::new(SheetsBackend::connect(
                    &self.sheets_endpoint,
                    sheet_id,
                    token,
                )?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendKind, ConfigError, StoreConfig, ENV_BACKEND, ENV_SHEET_ID};
    use crate::repo::RecordBackend;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_csv_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, BackendKind::Csv);
        assert_eq!(config.data_file(), PathBuf::from("car_sales_data.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sqlite_backend_gets_its_own_default_file() {
        let config = StoreConfig::from_lookup(lookup(&[(ENV_BACKEND, "SQLite")])).unwrap();
        assert_eq!(config.data_file(), PathBuf::from("car_sales_data.sqlite3"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[(ENV_BACKEND, "ods")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn excel_backend_defaults_to_legacy_workbook() {
        let config = StoreConfig::from_lookup(lookup(&[(ENV_BACKEND, "Excel")])).unwrap();
        assert_eq!(config.backend, BackendKind::Xlsx);
        assert_eq!(config.data_file(), PathBuf::from("car_sales_data.xlsx"));
        assert_eq!(
            config.open_backend().unwrap().describe(),
            "xlsx:car_sales_data.xlsx"
        );
    }

    #[test]
    fn sheets_backend_requires_id_and_token() {
        let config = StoreConfig::from_lookup(lookup(&[(ENV_BACKEND, "sheets")])).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::Missing(ENV_SHEET_ID)));

        let config = StoreConfig::from_lookup(lookup(&[
            (ENV_BACKEND, "sheets"),
            (ENV_SHEET_ID, "abc"),
            ("CARSALES_SHEETS_TOKEN", "  "),
        ]))
        .unwrap();
        assert!(config.validate().is_err());
    }
}
