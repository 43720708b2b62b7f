//! In-process tabular store.
//!
//! Used by tests and dry runs. Tables can be marked as failing to
//! exercise abort paths in the coordinator.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{column_tail, Cell, StoreError, TabularStore};

#[derive(Debug, Clone, Default)]
struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Tabular store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty table with the given header row
    pub fn with_table<S: AsRef<str>>(self, table: &str, header: &[S]) -> Self {
        self.lock_tables().insert(
            table.to_string(),
            Table {
                header: header.iter().map(|h| h.as_ref().to_string()).collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    /// Add a data row without going through the store contract
    pub fn with_row(self, table: &str, row: Vec<Cell>) -> Self {
        self.lock_tables()
            .entry(table.to_string())
            .or_default()
            .rows
            .push(row);
        self
    }

    /// Make every operation on `table` fail with [`StoreError::Unavailable`]
    pub fn fail_table(&self, table: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(table.to_string());
    }

    /// Snapshot of a table's data rows
    pub fn rows(&self, table: &str) -> Vec<Vec<Cell>> {
        self.lock_tables()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, HashMap<String, Table>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self, table: &str) -> Result<(), StoreError> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(table) {
            return Err(StoreError::Unavailable(format!("table '{}' is failing", table)));
        }
        Ok(())
    }

    fn with_existing<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut Table) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.check_available(table)?;
        let mut tables = self.lock_tables();
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        f(entry)
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append_row(&self, table: &str, record: &[i64]) -> Result<(), StoreError> {
        self.with_existing(table, |t| {
            t.rows.push(record.iter().copied().map(Cell::Number).collect());
            Ok(())
        })
    }

    async fn read_last_row(&self, table: &str) -> Result<Vec<Cell>, StoreError> {
        self.with_existing(table, |t| {
            t.rows
                .last()
                .cloned()
                .ok_or_else(|| StoreError::EmptyTable(table.to_string()))
        })
    }

    async fn read_last_n_of_column(
        &self,
        table: &str,
        column_index: usize,
        n: usize,
    ) -> Result<Vec<i64>, StoreError> {
        self.with_existing(table, |t| column_tail(table, &t.rows, column_index, n))
    }

    async fn read_header_row(&self, table: &str) -> Result<Vec<String>, StoreError> {
        self.with_existing(table, |t| Ok(t.header.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_read_back() {
        let store = MemoryStore::new().with_table("sales", &["a", "b"]);

        store.append_row("sales", &[1, 2]).await.unwrap();
        store.append_row("sales", &[3, 4]).await.unwrap();

        assert_eq!(
            store.read_last_row("sales").await.unwrap(),
            vec![Cell::Number(3), Cell::Number(4)]
        );
        assert_eq!(
            store.read_last_n_of_column("sales", 1, 5).await.unwrap(),
            vec![2, 4]
        );
        assert_eq!(store.read_header_row("sales").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_and_empty_tables() {
        let store = MemoryStore::new().with_table("stock", &["a"]);

        assert!(matches!(
            store.append_row("surplus", &[1]).await,
            Err(StoreError::TableNotFound(_))
        ));
        assert!(matches!(
            store.read_last_row("stock").await,
            Err(StoreError::EmptyTable(_))
        ));
    }

    #[tokio::test]
    async fn test_failing_table() {
        let store = MemoryStore::new().with_table("stock", &["a"]);
        store.fail_table("stock");

        assert!(matches!(
            store.append_row("stock", &[1]).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.rows("stock").is_empty());
    }
}
