//! Restock projection from a trailing window of sales.
//!
//! Each product's projection is the arithmetic mean of its window,
//! scaled by `1 + margin`, rounded to the nearest integer with ties going
//! to the even neighbour (so 32.5 → 32 and 33.5 → 34).

use thiserror::Error;

use crate::domain::ForecastRecord;

/// A product column had no sales history to average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no sales history for product column {product}; seed the sales table before forecasting")]
pub struct EmptyHistoryError {
    /// 0-based product column
    pub product: usize,
}

/// Projection failures
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ForecastError {
    #[error(transparent)]
    EmptyHistory(#[from] EmptyHistoryError),

    #[error("projection for product column {product} is out of range ({value})")]
    OutOfRange { product: usize, value: f64 },
}

/// Most recent sales per product column, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryWindow {
    columns: Vec<Vec<i64>>,
}

impl HistoryWindow {
    pub fn new(columns: Vec<Vec<i64>>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Vec<i64>] {
        &self.columns
    }

    /// Shortest column length, i.e. how many sessions every product covers
    pub fn depth(&self) -> usize {
        self.columns.iter().map(Vec::len).min().unwrap_or(0)
    }
}

/// Round to nearest, ties to even. `None` when the result does not fit an `i64`.
pub fn round_half_even(value: f64) -> Option<i64> {
    let rounded = value.round_ties_even();
    // i64::MAX as f64 is 2^63, one past the largest representable value
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Project the next stock quantity for every product column.
///
/// Short histories are averaged as they are; nothing is padded.
pub fn project_stock(
    history: &[Vec<i64>],
    margin: f64,
) -> Result<ForecastRecord, ForecastError> {
    history
        .iter()
        .enumerate()
        .map(|(product, column)| {
            if column.is_empty() {
                return Err(EmptyHistoryError { product }.into());
            }

            let average = column.iter().map(|&v| v as f64).sum::<f64>() / column.len() as f64;
            let value = average * (1.0 + margin);
            round_half_even(value).ok_or(ForecastError::OutOfRange { product, value })
        })
        .collect::<Result<Vec<i64>, _>>()
        .map(ForecastRecord::from)
}

/// [`project_stock`] over a [`HistoryWindow`]
pub fn project_window(
    window: &HistoryWindow,
    margin: f64,
) -> Result<ForecastRecord, ForecastError> {
    project_stock(window.columns(), margin)
}
