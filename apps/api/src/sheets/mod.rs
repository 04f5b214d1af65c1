//! Spreadsheet access for the recruiter dashboard and the decision log.

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::AppError;

pub mod auth;
pub mod dashboard;
pub mod google;
#[cfg(test)]
pub mod memory;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Service account error: {0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl From<SheetsError> for AppError {
    fn from(e: SheetsError) -> Self {
        AppError::Sheets(e.to_string())
    }
}

/// Minimal A1-range spreadsheet operations. Cells are plain strings.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    async fn tab_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetsError>;

    /// Adds a tab with its first row frozen.
    async fn add_tab(&self, spreadsheet_id: &str, title: &str) -> Result<(), SheetsError>;

    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError>;

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError>;

    /// Appends rows after the last non-empty row of `range`.
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError>;
}

/// `'IT Support'!A2:O`, with embedded quotes doubled.
pub fn a1(tab: &str, cells: &str) -> String {
    format!("'{}'!{}", tab.replace('\'', "''"), cells)
}

/// Adds `title` unless the spreadsheet already has it. Returns true when created.
pub async fn ensure_tab(
    api: &dyn SheetsApi,
    spreadsheet_id: &str,
    title: &str,
    headers: &[&str],
) -> Result<bool, SheetsError> {
    let titles = api.tab_titles(spreadsheet_id).await?;
    if titles.iter().any(|t| t == title) {
        return Ok(false);
    }

    api.add_tab(spreadsheet_id, title).await?;
    let last_column = column_letter(headers.len());
    api.write_range(
        spreadsheet_id,
        &a1(title, &format!("A1:{last_column}1")),
        vec![headers.iter().map(|h| h.to_string()).collect()],
    )
    .await?;
    tracing::info!("Created sheet tab '{title}'");
    Ok(true)
}

/// 1-based column index to its letter. Supports up to 26 columns.
pub fn column_letter(index: usize) -> char {
    let index = index.clamp(1, 26) as u8;
    (b'A' + index - 1) as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::memory::InMemorySheets;

    #[test]
    fn test_a1_quotes_tab() {
        assert_eq!(a1("IT Support", "A2:O"), "'IT Support'!A2:O");
        assert_eq!(a1("Ops' Desk", "A:A"), "'Ops'' Desk'!A:A");
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), 'A');
        assert_eq!(column_letter(15), 'O');
        assert_eq!(column_letter(16), 'P');
    }

    #[tokio::test]
    async fn test_ensure_tab_writes_headers_once() {
        let sheets = InMemorySheets::new();
        assert!(ensure_tab(&sheets, "s1", "IT Support", &["A", "B"]).await.unwrap());
        assert!(!ensure_tab(&sheets, "s1", "IT Support", &["A", "B"]).await.unwrap());
        assert_eq!(sheets.rows("s1", "IT Support"), vec![vec!["A", "B"]]);
    }
}
