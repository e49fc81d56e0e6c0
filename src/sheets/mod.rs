pub mod auth;
pub mod client;

use async_trait::async_trait;

pub use client::{SheetsClient, SheetsSettings};

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

#[derive(Debug)]
pub enum SheetsError {
    /// Token exchange with the OAuth endpoint failed.
    Auth(String),
    /// Network failure or timeout.
    Transport(String),
    /// The Sheets API answered with a non-success status.
    Api { status: u16, body: String },
}

impl std::fmt::Display for SheetsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsError::Auth(msg) => write!(f, "authentication failed: {msg}"),
            SheetsError::Transport(msg) => write!(f, "request failed: {msg}"),
            SheetsError::Api { status, body } => write!(f, "API returned {status}: {body}"),
        }
    }
}

impl std::error::Error for SheetsError {}

/// Destination for submission rows.
#[async_trait]
pub trait RowAppender: Send + Sync {
    /// Append one row to the end of the target range.
    async fn append_row(&self, row: Vec<String>) -> Result<(), SheetsError>;
}

/// Spreadsheet column letter for a 1-based column index: 1 -> A, 27 -> AA.
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1 range covering `columns` columns from A, e.g. `'Sheet1'!A:D`.
pub fn range_for(sheet: &str, columns: usize) -> String {
    let quoted = sheet.replace('\'', "''");
    format!("'{quoted}'!A:{}", column_letter(columns.max(1)))
}
