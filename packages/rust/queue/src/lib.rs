//! Remote task queue access for Pressline.
//!
//! The pipeline only sees the [`TaskQueue`] port: a rectangular read of the
//! queue tab and a batched cell write. [`SheetsQueue`] talks to the Google
//! Sheets v4 values API; [`MemoryQueue`] backs tests and dry runs.
//! [`fetch_actionable_tasks`] turns raw rows into validated [`Task`]s.
//!
//! [`Task`]: pressline_shared::Task

mod auth;
mod memory;
mod schema;
mod sheets;

use async_trait::async_trait;
use pressline_shared::Result;

pub use auth::{SPREADSHEETS_SCOPE, ServiceAccountTokens, StaticToken, TokenSource};
pub use memory::MemoryQueue;
pub use schema::{
    OPTIONAL_COLUMNS, QueueSnapshot, REQUIRED_COLUMNS, fetch_actionable_tasks, parse_rows,
};
pub use sheets::SheetsQueue;

/// One cell write: 1-based sheet row, 0-based column index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: u32,
    pub column: usize,
    pub value: String,
}

/// Read/write port for the external task queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// All rows of the queue tab, header first. Cells are stringified;
    /// trailing empty cells may be absent.
    async fn read_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Write every update in one request.
    async fn write_cells(&self, updates: &[CellUpdate]) -> Result<()>;
}

/// Spreadsheet column letter for a 0-based index: 0 → `A`, 26 → `AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// A1 reference such as `Queue!I2`.
pub fn a1_cell(sheet: &str, update: &CellUpdate) -> String {
    format!("{}!{}{}", quote_sheet(sheet), column_letter(update.column), update.row)
}

/// Tab names with anything beyond `[A-Za-z0-9_]` must be single-quoted.
fn quote_sheet(sheet: &str) -> String {
    if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(7), "H");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn a1_reference_quotes_when_needed() {
        let update = CellUpdate {
            row: 5,
            column: 7,
            value: "PUBLISHED".into(),
        };
        assert_eq!(a1_cell("Queue", &update), "Queue!H5");
        assert_eq!(a1_cell("SEO Queue", &update), "'SEO Queue'!H5");
        assert_eq!(a1_cell("Bob's", &update), "'Bob''s'!H5");
    }
}
