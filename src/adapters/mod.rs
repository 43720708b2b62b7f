//! Tabular store adapters.
//!
//! The pipeline only needs a narrow contract from wherever the sales,
//! surplus and stock tables live: append a row, read the last row, read
//! the tail of a column, read the header row.

pub mod memory;
pub mod workbook;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use workbook::WorkbookStore;

/// Errors talking to a tabular store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("table '{0}' has no data rows")]
    EmptyTable(String),

    #[error("table '{table}' already exists")]
    TableExists { table: String },

    #[error("table '{table}' row {row} has no column {column}")]
    ColumnOutOfRange {
        table: String,
        row: usize,
        column: usize,
    },

    #[error("table '{table}' column {column} holds '{value}', expected a non-negative whole number")]
    InvalidCell {
        table: String,
        column: usize,
        value: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single cell as stored: stores may hand back numbers or text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(i64),
    Text(String),
}

impl Cell {
    /// Interpret the cell as a whole number (text is trimmed and parsed)
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Quantities are whole numbers >= 0; anything else is an invalid cell
fn cell_quantity(table: &str, column: usize, cell: &Cell) -> Result<i64, StoreError> {
    cell.as_integer()
        .filter(|n| *n >= 0)
        .ok_or_else(|| StoreError::InvalidCell {
            table: table.to_string(),
            column,
            value: cell.to_string(),
        })
}

/// Convert a row of cells to integers, naming the offending column on failure
pub fn cells_to_integers(table: &str, cells: &[Cell]) -> Result<Vec<i64>, StoreError> {
    cells
        .iter()
        .enumerate()
        .map(|(column, cell)| cell_quantity(table, column, cell))
        .collect()
}

/// Last `n` values of `column` from a table's data rows, oldest first.
///
/// Row numbers in errors count the header as row 1.
pub fn column_tail(
    table: &str,
    rows: &[Vec<Cell>],
    column: usize,
    n: usize,
) -> Result<Vec<i64>, StoreError> {
    let start = rows.len().saturating_sub(n);

    rows[start..]
        .iter()
        .enumerate()
        .map(|(offset, row)| {
            let cell = row.get(column).ok_or_else(|| StoreError::ColumnOutOfRange {
                table: table.to_string(),
                row: start + offset + 2,
                column,
            })?;
            cell_quantity(table, column, cell)
        })
        .collect()
}

/// Row-oriented, append-only table storage
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Human-readable store name
    fn name(&self) -> &str;

    /// Append a data row to the end of a table
    async fn append_row(&self, table: &str, record: &[i64]) -> Result<(), StoreError>;

    /// Most recent data row of a table
    async fn read_last_row(&self, table: &str) -> Result<Vec<Cell>, StoreError>;

    /// Up to `n` most recent values of a column (0-based), oldest first
    async fn read_last_n_of_column(
        &self,
        table: &str,
        column_index: usize,
        n: usize,
    ) -> Result<Vec<i64>, StoreError>;

    /// Column headings of a table
    async fn read_header_row(&self, table: &str) -> Result<Vec<String>, StoreError>;
}
