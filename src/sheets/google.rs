//! Sheets v4 / Drive v3 HTTP back end
//!
//! Blocking client authenticated with a bearer token obtained elsewhere
//! (see `MENUSYNC_ACCESS_TOKEN`). Token refresh is not handled here.

use std::ops::Range;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{quote_tab, RemoteError, RemoteResult, SheetsService};
use crate::core::operations::WriteOperation;
use crate::types::{GridData, SheetProperties, SpreadsheetMetadata};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

pub const TOKEN_ENV: &str = "MENUSYNC_ACCESS_TOKEN";

pub struct GoogleSheets {
    client: Client,
    token: String,
}

impl GoogleSheets {
    pub fn new(token: impl Into<String>) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("menusync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Permanent(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    /// Build from `MENUSYNC_ACCESS_TOKEN`, `None` when it is unset or empty.
    pub fn from_env() -> Option<RemoteResult<Self>> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(|t| Self::new(t.trim()))
    }

    fn url(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = Url::parse(SHEETS_API)
            .map_err(|e| RemoteError::Permanent(format!("Bad API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Permanent("API URL cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> RemoteResult<Value> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| RemoteError::Permanent(format!("HTTP request failed: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RemoteError::Permanent(format!("Failed to read response: {}", e)))?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body)
                .map_err(|e| RemoteError::Permanent(format!("Invalid JSON response: {}", e)));
        }
        Err(classify_failure(status, &body))
    }
}

/// 429 and `RATE_LIMIT_EXCEEDED` bodies are transient; everything else is not.
pub fn classify_failure(status: StatusCode, body: &str) -> RemoteError {
    let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RATE_LIMIT_EXCEEDED") {
        RemoteError::RateLimited(message)
    } else {
        RemoteError::Permanent(message)
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetEntry {
    properties: SheetProperties,
    #[serde(default)]
    data: Vec<GridData>,
}

#[derive(Deserialize)]
struct SpreadsheetTitle {
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    #[serde(default)]
    spreadsheet_id: Option<String>,
    #[serde(default)]
    properties: Option<SpreadsheetTitle>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> RemoteResult<T> {
    serde_json::from_value(value)
        .map_err(|e| RemoteError::Permanent(format!("Unexpected response shape: {}", e)))
}

fn cell_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetsService for GoogleSheets {
    fn fetch_values(&self, spreadsheet_id: &str, tab: &str) -> RemoteResult<Vec<Vec<String>>> {
        let range = format!("{}!A:Z", quote_tab(tab));
        let url = self.url(&[spreadsheet_id, "values", range.as_str()])?;
        let body = self.send(
            self.client
                .get(url)
                .query(&[("valueRenderOption", "FORMATTED_VALUE")]),
        )?;
        let values: ValueRange = decode(body)?;
        Ok(values
            .values
            .iter()
            .map(|row| row.iter().map(cell_string).collect())
            .collect())
    }

    fn fetch_grid(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        rows: Range<usize>,
    ) -> RemoteResult<GridData> {
        if rows.is_empty() {
            return Ok(GridData::default());
        }
        let range = format!("{}!A{}:Z{}", quote_tab(tab), rows.start + 1, rows.end);
        debug!("Fetching grid data for {}", range);
        let url = self.url(&[spreadsheet_id])?;
        let body = self.send(
            self.client
                .get(url)
                .query(&[("ranges", range.as_str()), ("includeGridData", "true")]),
        )?;
        let spreadsheet: Spreadsheet = decode(body)?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .next()
            .and_then(|s| s.data.into_iter().next())
            .unwrap_or_default())
    }

    fn fetch_metadata(&self, spreadsheet_id: &str) -> RemoteResult<SpreadsheetMetadata> {
        let url = self.url(&[spreadsheet_id])?;
        let body = self.send(
            self.client
                .get(url)
                .query(&[("fields", "properties.title,sheets.properties(sheetId,title)")]),
        )?;
        let spreadsheet: Spreadsheet = decode(body)?;
        Ok(SpreadsheetMetadata {
            title: spreadsheet.properties.map(|p| p.title).unwrap_or_default(),
            sheets: spreadsheet.sheets.into_iter().map(|s| s.properties).collect(),
        })
    }

    fn search_by_title(&self, title: &str) -> RemoteResult<Option<String>> {
        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            title.replace('\\', "\\\\").replace('\'', "\\'"),
            SPREADSHEET_MIME
        );
        let body = self.send(self.client.get(DRIVE_FILES_API).query(&[
            ("q", query.as_str()),
            ("spaces", "drive"),
            ("fields", "files(id, name)"),
        ]))?;
        let list: DriveFileList = decode(body)?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    fn create_resource(&self, title: &str, tabs: &[String]) -> RemoteResult<String> {
        let sheets: Vec<Value> = tabs
            .iter()
            .map(|t| json!({"properties": {"title": t}}))
            .collect();
        let mut payload = json!({"properties": {"title": title}});
        if !sheets.is_empty() {
            payload["sheets"] = Value::Array(sheets);
        }
        let url = self.url(&[])?;
        let body = self.send(
            self.client
                .post(url)
                .query(&[("fields", "spreadsheetId")])
                .json(&payload),
        )?;
        let created: Spreadsheet = decode(body)?;
        created
            .spreadsheet_id
            .ok_or_else(|| RemoteError::Permanent("Create response had no spreadsheetId".to_string()))
    }

    fn clear_range(&self, spreadsheet_id: &str, range: &str) -> RemoteResult<()> {
        let url = self.url(&[spreadsheet_id, "values", format!("{}:clear", range).as_str()])?;
        self.send(self.client.post(url).json(&json!({})))?;
        Ok(())
    }

    fn apply_batch(&self, spreadsheet_id: &str, operations: &[WriteOperation]) -> RemoteResult<()> {
        let url = self.url(&[format!("{}:batchUpdate", spreadsheet_id).as_str()])?;
        self.send(
            self.client
                .post(url)
                .json(&json!({ "requests": operations })),
        )?;
        Ok(())
    }

    fn update_title(&self, spreadsheet_id: &str, title: &str) -> RemoteResult<()> {
        let url = self.url(&[format!("{}:batchUpdate", spreadsheet_id).as_str()])?;
        let payload = json!({
            "requests": [{
                "updateSpreadsheetProperties": {
                    "properties": {"title": title},
                    "fields": "title"
                }
            }]
        });
        self.send(self.client.post(url).json(&payload))?;
        Ok(())
    }
}
