//! Surplus calculation: stock minus sales, per product column.

use crate::domain::{DimensionError, SalesRecord, StockRecord, SurplusRecord};

/// Subtract sales from stock column by column.
///
/// Results are signed and never clamped: a negative value means demand
/// exceeded what was stocked.
pub fn compute_surplus(
    stock: &StockRecord,
    sales: &SalesRecord,
) -> Result<SurplusRecord, DimensionError> {
    DimensionError::check(stock.len(), sales.len())?;

    Ok(stock
        .iter()
        .zip(sales.iter())
        .map(|(stocked, sold)| stocked - sold)
        .collect::<Vec<i64>>()
        .into())
}
