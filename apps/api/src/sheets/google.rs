use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::sheets::auth::ServiceAccountAuth;
use crate::sheets::{SheetsApi, SheetsError};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Google Sheets v4 REST client authenticated as a service account.
pub struct GoogleSheetsClient {
    http: Client,
    auth: ServiceAccountAuth,
    base_url: Url,
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

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsClient {
    pub fn new(http: Client, auth: ServiceAccountAuth) -> Result<Self, SheetsError> {
        let base_url = Url::parse(SHEETS_API_BASE)
            .map_err(|e| SheetsError::Request(format!("bad base url: {e}")))?;
        Ok(Self {
            http,
            auth,
            base_url,
        })
    }

    /// `/v4/spreadsheets/{id}/...` with every segment percent-encoded.
    fn url(&self, spreadsheet_id: &str, tail: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::Request("base url cannot hold a path".to_string()))?
            .extend(["v4", "spreadsheets", spreadsheet_id])
            .extend(tail);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, SheetsError> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn tab_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetsError> {
        let url = self.url(spreadsheet_id, &[])?;
        let body = self
            .send(self.http.get(url).query(&[("fields", "sheets.properties.title")]))
            .await?;
        let meta: SpreadsheetMeta = serde_json::from_value(body)
            .map_err(|e| SheetsError::Request(format!("unexpected metadata: {e}")))?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_tab(&self, spreadsheet_id: &str, title: &str) -> Result<(), SheetsError> {
        let url = self.url(&format!("{spreadsheet_id}:batchUpdate"), &[])?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {"frozenRowCount": 1}
                    }
                }
            }]
        });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.url(spreadsheet_id, &["values", range])?;
        let body = self.send(self.http.get(url)).await?;
        let range: ValueRange = serde_json::from_value(body)
            .map_err(|e| SheetsError::Request(format!("unexpected values: {e}")))?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let url = self.url(spreadsheet_id, &["values", range])?;
        let body = json!({"range": range, "majorDimension": "ROWS", "values": rows});
        self.send(
            self.http
                .put(url)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let url = self.url(spreadsheet_id, &["values", &format!("{range}:append")])?;
        let body = json!({"values": rows});
        self.send(
            self.http
                .post(url)
                .query(&[
                    ("valueInputOption", "USER_ENTERED"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&body),
        )
        .await?;
        Ok(())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
