//! Loads uploaded test-failure tables (delimited text or spreadsheets).

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb", "ods"];

const TEST_COLUMNS: &[&str] = &["test", "test_id", "testid", "testname", "test name", "test_name"];
const OWNER_COLUMNS: &[&str] = &["owner", "test owner", "test_owner"];
const ERROR_COLUMNS: &[&str] = &[
    "errormessage",
    "error message",
    "error_message",
    "error",
    "failure",
];
const STATUS_COLUMNS: &[&str] = &["status", "result", "outcome"];

#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid delimited data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("spreadsheet has no worksheets")]
    NoWorksheet,
    #[error("table has no header row")]
    MissingHeader,
}

/// One failing (or passing) test row, keyed the way the analysis slot stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(rename = "Test")]
    pub test: String,
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "ErrorMessage")]
    pub error_message: String,
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FailureTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_status_column(&self) -> bool {
        self.column_index(STATUS_COLUMNS).is_some()
    }

    fn column_index(&self, aliases: &[&str]) -> Option<usize> {
        self.headers.iter().position(|header| {
            let normalized = header.trim().to_lowercase();
            aliases.contains(&normalized.as_str())
        })
    }

    pub fn records(&self) -> Vec<FailureRecord> {
        let test = self.column_index(TEST_COLUMNS);
        let owner = self.column_index(OWNER_COLUMNS);
        let error = self.column_index(ERROR_COLUMNS);
        let status = self.column_index(STATUS_COLUMNS);
        let cell = |row: &[String], index: Option<usize>| -> String {
            index
                .and_then(|index| row.get(index))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        self.rows
            .iter()
            .map(|row| FailureRecord {
                test: cell(row, test),
                owner: cell(row, owner),
                error_message: cell(row, error),
                status: status.map(|_| cell(row, status)),
            })
            .collect()
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            let lowered = extension.to_ascii_lowercase();
            SPREADSHEET_EXTENSIONS.contains(&lowered.as_str())
        })
        .unwrap_or(false)
}

/// Reads the first worksheet of a spreadsheet, or a delimited text file.
pub fn load_failure_table(path: &Path) -> Result<FailureTable, TableLoadError> {
    if !path.is_file() {
        return Err(TableLoadError::NotFound(path.to_path_buf()));
    }
    if is_spreadsheet(path) {
        load_spreadsheet(path)
    } else {
        let raw = std::fs::read_to_string(path).map_err(|source| TableLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_delimited(&raw)
    }
}

fn load_spreadsheet(path: &Path) -> Result<FailureTable, TableLoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TableLoadError::NoWorksheet)??;
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
    let headers = rows.next().ok_or(TableLoadError::MissingHeader)?;
    let rows = rows.filter(|row| !is_blank_row(row.as_slice())).collect();
    Ok(FailureTable::new(headers, rows))
}

fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|cell| cell.trim().is_empty())
}

/// Tab when the header line contains one, comma otherwise.
pub fn sniff_delimiter(raw: &str) -> u8 {
    let header = raw.lines().next().unwrap_or_default();
    if header.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

pub fn parse_delimited(raw: &str) -> Result<FailureTable, TableLoadError> {
    let raw = raw.trim_start_matches('\u{feff}');
    if raw.trim().is_empty() {
        return Err(TableLoadError::MissingHeader);
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(raw))
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.to_string())
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let cells = record?
            .iter()
            .map(|cell| cell.to_string())
            .collect::<Vec<_>>();
        if !is_blank_row(cells.as_slice()) {
            rows.push(cells);
        }
    }
    Ok(FailureTable::new(headers, rows))
}
