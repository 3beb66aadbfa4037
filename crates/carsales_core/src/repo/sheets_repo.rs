//! Cloud spreadsheet backend (Google Sheets values API).
//!
//! # Responsibility
//! - Map the first sheet of a remote spreadsheet to the sales table.
//! - Keep HTTP details behind [`SheetValuesApi`] so the mapping is testable.
//!
//! # Invariants
//! - Only columns `A:E` are read or written.
//! - Save writes header and rows first, then clears rows below the new end.
//!   Existing data is never cleared before its replacement is written.
//! - A failure between the write and the trailing clear leaves stale rows at
//!   the bottom of the sheet; it never loses rows.

use crate::model::table::Table;
use crate::repo::{header_row, is_blank_row, ColumnMap, RecordBackend, StorageError, StorageResult};
use log::{error, info};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Default Sheets API endpoint.
pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com";

const TABLE_RANGE: &str = "A1:E";
const WRITE_ANCHOR: &str = "A1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cell-level access to the first sheet of one spreadsheet.
///
/// Ranges use A1 notation without a sheet name, which addresses the first
/// visible sheet.
pub trait SheetValuesApi {
    /// Returns rows of the range; trailing empty cells may be omitted.
    fn get_values(&self, range: &str) -> StorageResult<Vec<Vec<String>>>;
    /// Writes `rows` starting at the top-left cell of `range`.
    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> StorageResult<()>;
    /// Empties every cell in `range`.
    fn clear_values(&self, range: &str) -> StorageResult<()>;
    /// Spreadsheet identity for logs.
    fn describe(&self) -> String;
}

impl<A: SheetValuesApi + ?Sized> SheetValuesApi for &A {
    fn get_values(&self, range: &str) -> StorageResult<Vec<Vec<String>>> {
        (**self).get_values(range)
    }

    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> StorageResult<()> {
        (**self).update_values(range, rows)
    }

    fn clear_values(&self, range: &str) -> StorageResult<()> {
        (**self).clear_values(range)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeRequest<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

/// Sheets values API over HTTPS with a pre-issued OAuth bearer token.
pub struct HttpSheetsApi {
    client: Client,
    endpoint: String,
    spreadsheet_id: String,
    access_token: String,
}

impl HttpSheetsApi {
    pub fn new(
        endpoint: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> StorageResult<Self> {
        let spreadsheet_id = spreadsheet_id.into();
        if spreadsheet_id.trim().is_empty() {
            return Err(StorageError::Unreachable(
                "spreadsheet id cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| StorageError::Unreachable(format!("http client setup failed: {err}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            access_token: access_token.into(),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.endpoint, self.spreadsheet_id, range
        )
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> StorageResult<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|err| StorageError::Unreachable(format!("sheets request failed: {err}")))?;
        check_status(response)
    }
}

impl SheetValuesApi for HttpSheetsApi {
    fn get_values(&self, range: &str) -> StorageResult<Vec<Vec<String>>> {
        let url = format!("{}?majorDimension=ROWS", self.values_url(range));
        let response = self.send(self.client.get(url))?;
        let body: ValueRangeResponse = response
            .json()
            .map_err(|err| StorageError::Malformed(format!("sheets response body: {err}")))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn update_values(&self, range: &str, rows: &[Vec<String>]) -> StorageResult<()> {
        let url = format!("{}?valueInputOption=RAW", self.values_url(range));
        let body = ValueRangeRequest {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        self.send(self.client.put(url).json(&body))?;
        Ok(())
    }

    fn clear_values(&self, range: &str) -> StorageResult<()> {
        let url = format!("{}:clear", self.values_url(range));
        self.send(self.client.post(url).json(&serde_json::json!({})))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sheets:{}", self.spreadsheet_id)
    }
}

/// Sales table stored in the first sheet of a remote spreadsheet.
pub struct SheetsBackend<A: SheetValuesApi = HttpSheetsApi> {
    api: Option<A>,
}

impl SheetsBackend<HttpSheetsApi> {
    /// Connects to `spreadsheet_id` through the HTTP values API.
    pub fn connect(
        endpoint: &str,
        spreadsheet_id: &str,
        access_token: &str,
    ) -> StorageResult<Self> {
        let api = HttpSheetsApi::new(endpoint, spreadsheet_id, access_token)?;
        Ok(Self::open(api))
    }
}

impl<A: SheetValuesApi> SheetsBackend<A> {
    pub fn open(api: A) -> Self {
        info!(
            "event=backend_open module=sheets_repo status=ok sheet={}",
            api.describe()
        );
        Self { api: Some(api) }
    }

    fn api(&self) -> StorageResult<&A> {
        self.api
            .as_ref()
            .ok_or_else(|| StorageError::Unreachable("sheets backend is closed".to_string()))
    }

    fn read_table(&self) -> StorageResult<Table> {
        let rows = self.api()?.get_values(TABLE_RANGE)?;
        let mut rows = rows.into_iter();

        let Some(headers) = rows.next() else {
            return Ok(Table::new());
        };
        if is_blank_row(headers.as_slice()) {
            return Ok(Table::new());
        }
        let columns = ColumnMap::resolve(headers.as_slice())?;

        Ok(rows
            .filter(|row| !is_blank_row(row.as_slice()))
            .map(|row| columns.record(row.as_slice()))
            .collect())
    }

    fn write_table(&self, table: &Table) -> StorageResult<()> {
        let api = self.api()?;
        let mut rows = Vec::with_capacity(table.len() + 1);
        rows.push(header_row());
        rows.extend(table.iter().map(|record| record.to_row()));

        api.update_values(WRITE_ANCHOR, &rows)?;
        api.clear_values(&stale_rows_range(rows.len()))?;
        Ok(())
    }
}

impl<A: SheetValuesApi> RecordBackend for SheetsBackend<A> {
    fn load(&self) -> StorageResult<Table> {
        let started_at = Instant::now();
        let result = self.read_table();
        match &result {
            Ok(table) => info!(
                "event=table_load module=sheets_repo status=ok sheet={} rows={} duration_ms={}",
                self.describe(),
                table.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_load module=sheets_repo status=error sheet={} error_code={} error={}",
                self.describe(),
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
                "event=table_save module=sheets_repo status=ok sheet={} rows={} duration_ms={}",
                self.describe(),
                table.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=table_save module=sheets_repo status=error sheet={} error_code={} error={}",
                self.describe(),
                err.code(),
                err
            ),
        }
        result
    }

    fn describe(&self) -> String {
        self.api
            .as_ref()
            .map_or_else(|| "sheets:closed".to_string(), |api| api.describe())
    }

    fn close(&mut self) -> StorageResult<()> {
        if let Some(api) = self.api.take() {
            info!(
                "event=backend_close module=sheets_repo status=ok sheet={}",
                api.describe()
            );
        }
        Ok(())
    }
}

/// Range covering every row after the first `written_rows` rows.
fn stale_rows_range(written_rows: usize) -> String {
    format!("A{}:E", written_rows + 1)
}

fn check_status(response: Response) -> StorageResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response.text().unwrap_or_default();
    let message = format!("sheets api returned {status}: {}", detail.trim());
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            StorageError::PermissionDenied(message)
        }
        _ => StorageError::Unreachable(message),
    })
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{cell_text, stale_rows_range};
    use serde_json::json;

    #[test]
    fn stale_range_starts_after_written_rows() {
        assert_eq!(stale_rows_range(1), "A2:E");
        assert_eq!(stale_rows_range(3), "A4:E");
    }

    #[test]
    fn non_string_cells_render_as_text() {
        assert_eq!(cell_text(json!(5000)), "5000");
        assert_eq!(cell_text(json!(null)), "");
        assert_eq!(cell_text(json!("CH001")), "CH001");
    }
}
