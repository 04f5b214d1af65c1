use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::sheets::{SheetsApi, SheetsError};

/// Grid-per-tab spreadsheet that understands the A1 ranges this crate emits.
#[derive(Default)]
pub struct InMemorySheets {
    tabs: Mutex<HashMap<(String, String), Vec<Vec<String>>>>,
}

struct Range {
    tab: String,
    start_row: usize,
}

/// Parses `'Tab'!A2:O` or `'Tab'!A5:O5` into tab and 1-based start row.
fn parse_range(range: &str) -> Result<Range, SheetsError> {
    let (tab, cells) = range
        .rsplit_once('!')
        .ok_or_else(|| SheetsError::Request(format!("bad range {range}")))?;
    let tab = tab.trim_matches('\'').replace("''", "'");
    let first = cells.split(':').next().unwrap_or("A1");
    let digits: String = first.chars().filter(|c| c.is_ascii_digit()).collect();
    let start_row = digits.parse().unwrap_or(1);
    Ok(Range { tab, start_row })
}

impl InMemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, spreadsheet_id: &str, tab: &str) -> Vec<Vec<String>> {
        self.tabs
            .lock()
            .unwrap()
            .get(&(spreadsheet_id.to_string(), tab.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SheetsApi for InMemorySheets {
    async fn tab_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetsError> {
        Ok(self
            .tabs
            .lock()
            .unwrap()
            .keys()
            .filter(|(id, _)| id == spreadsheet_id)
            .map(|(_, tab)| tab.clone())
            .collect())
    }

    async fn add_tab(&self, spreadsheet_id: &str, title: &str) -> Result<(), SheetsError> {
        self.tabs
            .lock()
            .unwrap()
            .entry((spreadsheet_id.to_string(), title.to_string()))
            .or_default();
        Ok(())
    }

    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let range = parse_range(range)?;
        let rows = self.rows(spreadsheet_id, &range.tab);
        Ok(rows.into_iter().skip(range.start_row - 1).collect())
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let range = parse_range(range)?;
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs
            .entry((spreadsheet_id.to_string(), range.tab))
            .or_default();
        for (offset, row) in rows.into_iter().enumerate() {
            let index = range.start_row - 1 + offset;
            if grid.len() <= index {
                grid.resize(index + 1, Vec::new());
            }
            grid[index] = row;
        }
        Ok(())
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let range = parse_range(range)?;
        self.tabs
            .lock()
            .unwrap()
            .entry((spreadsheet_id.to_string(), range.tab))
            .or_default()
            .extend(rows);
        Ok(())
    }
}
