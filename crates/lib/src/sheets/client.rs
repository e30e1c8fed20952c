//! Drive lookup by title and Sheets `values:append`.

use crate::sheets::{ServiceAccountKey, SheetsError, SHEETS_SCOPES};
use serde::Deserialize;

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// API hosts; overridable so tests can point at a local stub.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub drive_base: String,
    pub sheets_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            drive_base: "https://www.googleapis.com".to_string(),
            sheets_base: "https://sheets.googleapis.com".to_string(),
        }
    }
}

/// Client for one service account. Each call fetches a fresh access token.
#[derive(Clone)]
pub struct SheetsClient {
    key: ServiceAccountKey,
    endpoints: GoogleEndpoints,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

impl SheetsClient {
    pub fn with_endpoints(key: ServiceAccountKey, endpoints: GoogleEndpoints) -> Self {
        Self {
            key,
            endpoints: GoogleEndpoints {
                drive_base: endpoints.drive_base.trim_end_matches('/').to_string(),
                sheets_base: endpoints.sheets_base.trim_end_matches('/').to_string(),
            },
            client: reqwest::Client::new(),
        }
    }

    /// Append one row to the first worksheet of the spreadsheet titled `title`.
    pub async fn append_row_by_title(&self, title: &str, row: &[String]) -> Result<(), SheetsError> {
        let token = self.key.fetch_access_token(&self.client, SHEETS_SCOPES).await?;
        let spreadsheet_id = self.find_spreadsheet(&token, title).await?;
        let sheet = self.first_sheet_title(&token, &spreadsheet_id).await?;
        self.append_row(&token, &spreadsheet_id, &sheet, row).await
    }

    /// GET /drive/v3/files — first non-trashed spreadsheet with exactly this title.
    async fn find_spreadsheet(&self, token: &str, title: &str) -> Result<String, SheetsError> {
        let url = format!("{}/drive/v3/files", self.endpoints.drive_base);
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            title.replace('\\', "\\\\").replace('\'', "\\'"),
            SPREADSHEET_MIME
        );
        let res = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("drive files.list: {} {}", status, body)));
        }
        let data: DriveFileList = res.json().await?;
        data.files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(title.to_string()))
    }

    /// GET /v4/spreadsheets/{id} — title of the first worksheet.
    async fn first_sheet_title(&self, token: &str, spreadsheet_id: &str) -> Result<String, SheetsError> {
        let url = self.sheets_url(&[spreadsheet_id])?;
        let res = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("spreadsheets.get: {} {}", status, body)));
        }
        let data: SpreadsheetMeta = res.json().await?;
        data.sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| SheetsError::Api("spreadsheet has no worksheets".to_string()))
    }

    /// POST /v4/spreadsheets/{id}/values/{range}:append with RAW input, inserting a new row.
    async fn append_row(
        &self,
        token: &str,
        spreadsheet_id: &str,
        sheet: &str,
        row: &[String],
    ) -> Result<(), SheetsError> {
        let range = format!("'{}'", sheet.replace('\'', "''"));
        let url = self.sheets_url(&[spreadsheet_id, "values", &format!("{}:append", range)])?;
        let body = serde_json::json!({ "values": [row] });
        let res = self
            .client
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("values.append: {} {}", status, body)));
        }
        Ok(())
    }

    /// `{sheets_base}/v4/spreadsheets/<segments...>` with each segment percent-encoded.
    fn sheets_url(&self, segments: &[&str]) -> Result<reqwest::Url, SheetsError> {
        let mut url = reqwest::Url::parse(&self.endpoints.sheets_base)
            .map_err(|e| SheetsError::Api(format!("invalid sheets base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Api("sheets base url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }
}
