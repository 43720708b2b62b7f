//! Fixed-width per-product quantity records.
//!
//! Every table in the workbook shares one column order, so a record is
//! just an ordered list of quantities, one per product column.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Two records (or a record and a header row) expected to align had
/// different widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("record width mismatch: expected {expected} columns, got {actual}")]
pub struct DimensionError {
    pub expected: usize,
    pub actual: usize,
}

impl DimensionError {
    pub fn check(expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self { expected, actual })
        }
    }
}

/// Ordered quantities, one per product column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord(Vec<i64>);

/// Units sold in one session
pub type SalesRecord = ProductRecord;

/// Units stocked for the most recent session
pub type StockRecord = ProductRecord;

/// Stock minus sales; negative values mark a stock-out
pub type SurplusRecord = ProductRecord;

/// Projected quantities to stock for the next session
pub type ForecastRecord = ProductRecord;

impl ProductRecord {
    pub fn new(values: Vec<i64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[i64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &i64> {
        self.0.iter()
    }
}

impl From<Vec<i64>> for ProductRecord {
    fn from(values: Vec<i64>) -> Self {
        Self(values)
    }
}

impl fmt::Display for ProductRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", joined.join(","))
    }
}

/// A record paired with the column headings of the sales table.
///
/// Order follows the header row, so printing it lists products the
/// same way the workbook does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockValues(Vec<(String, i64)>);

impl StockValues {
    /// Pair each heading with the value in the same column
    pub fn from_headings(headings: &[String], data: &ProductRecord) -> Result<Self, DimensionError> {
        DimensionError::check(headings.len(), data.len())?;

        Ok(Self(
            headings
                .iter()
                .cloned()
                .zip(data.iter().copied())
                .collect(),
        ))
    }

    /// Look up the value for a column heading
    pub fn get(&self, heading: &str) -> Option<i64> {
        self.0
            .iter()
            .find(|(name, _)| name == heading)
            .map(|(_, value)| *value)
    }

    pub fn entries(&self) -> &[(String, i64)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StockValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.0 {
            writeln!(f, "  {:<16} {}", name, value)?;
        }
        Ok(())
    }
}
