//! File-backed workbook store.
//!
//! A workbook is a directory holding one `<table>.jsonl` file per table.
//! Each line is a JSON array of cells; line 1 is the header row. Files
//! are only ever appended to.

use std::fs::OpenOptions as StdOpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::{column_tail, Cell, StoreError, TabularStore};

const TABLE_EXTENSION: &str = "jsonl";

/// Directory of JSONL tables
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    dir: PathBuf,
}

impl WorkbookStore {
    /// Open an existing workbook directory
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the tables of a new workbook, all sharing one header row.
    ///
    /// When `seed_stock` is given it becomes the first data row of
    /// `stock_table`, which the first run reconciles sales against.
    pub async fn init<S: AsRef<str>>(
        dir: impl Into<PathBuf>,
        tables: &[&str],
        headers: &[S],
        stock_table: &str,
        seed_stock: Option<&[i64]>,
    ) -> Result<Self, StoreError> {
        let store = Self::open(dir);
        fs::create_dir_all(&store.dir).await?;

        for table in tables {
            if store.table_path(table).exists() {
                return Err(StoreError::TableExists {
                    table: table.to_string(),
                });
            }
        }

        let header: Vec<Cell> = headers.iter().map(|h| Cell::from(h.as_ref())).collect();
        for table in tables {
            store.append_line(table, header.clone(), true).await?;
        }

        if let Some(seed) = seed_stock {
            store.append_row(stock_table, seed).await?;
        }

        info!(dir = %store.dir.display(), tables = tables.len(), "Initialized workbook");
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a table's backing file
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", table, TABLE_EXTENSION))
    }

    /// Append one JSON line to a table file off the async runtime
    async fn append_line(
        &self,
        table: &str,
        cells: Vec<Cell>,
        create: bool,
    ) -> Result<(), StoreError> {
        let path = self.table_path(table);
        let table = table.to_string();

        tokio::task::spawn_blocking(move || write_line(&path, &table, &cells, create)).await?
    }

    /// All lines of a table, header first
    async fn read_lines(&self, table: &str) -> Result<Vec<Vec<Cell>>, StoreError> {
        let path = self.table_path(table);
        if !path.exists() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        let file = File::open(&path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut rows = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            rows.push(serde_json::from_str(&line)?);
        }

        Ok(rows)
    }

    /// Header row and data rows of a table
    pub async fn read_table(&self, table: &str) -> Result<(Vec<String>, Vec<Vec<Cell>>), StoreError> {
        let mut rows = self.read_lines(table).await?;
        if rows.is_empty() {
            return Err(StoreError::EmptyTable(table.to_string()));
        }

        let header = rows.remove(0).iter().map(Cell::to_string).collect();
        Ok((header, rows))
    }
}

/// Append one JSON line under an exclusive lock. Blocks.
fn write_line(path: &Path, table: &str, cells: &[Cell], create: bool) -> Result<(), StoreError> {
    let mut file = match StdOpenOptions::new().create(create).append(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    file.lock_exclusive().map_err(|source| StoreError::Lock {
        path: path.to_path_buf(),
        source,
    })?;

    let json = serde_json::to_string(cells)?;
    let written = writeln!(file, "{}", json).and_then(|_| file.flush());

    // Release before surfacing any write error
    file.unlock().map_err(|source| StoreError::Lock {
        path: path.to_path_buf(),
        source,
    })?;
    written?;

    Ok(())
}

#[async_trait]
impl TabularStore for WorkbookStore {
    fn name(&self) -> &str {
        "workbook"
    }

    async fn append_row(&self, table: &str, record: &[i64]) -> Result<(), StoreError> {
        let cells: Vec<Cell> = record.iter().copied().map(Cell::Number).collect();
        self.append_line(table, cells, false).await?;

        debug!(table, width = record.len(), "Appended row");
        Ok(())
    }

    async fn read_last_row(&self, table: &str) -> Result<Vec<Cell>, StoreError> {
        let (_, mut rows) = self.read_table(table).await?;
        rows.pop()
            .ok_or_else(|| StoreError::EmptyTable(table.to_string()))
    }

    async fn read_last_n_of_column(
        &self,
        table: &str,
        column_index: usize,
        n: usize,
    ) -> Result<Vec<i64>, StoreError> {
        let (_, rows) = self.read_table(table).await?;
        column_tail(table, &rows, column_index, n)
    }

    async fn read_header_row(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let (header, _) = self.read_table(table).await?;
        Ok(header)
    }
}
