//! restock - Daily sales reconciliation and restock forecasting
//!
//! Takes a session's per-product sales count, reconciles it against the
//! latest stock row to find surplus or stock-outs, and projects the next
//! stock from a trailing window of sales.
//!
//! # Pipeline
//!
//! 1. Validate operator input into a sales record
//! 2. Append it to the `sales` table
//! 3. Read the latest `stock` row and compute `stock - sales`
//! 4. Append the surplus to the `surplus` table
//! 5. Average the last few sales per product, add the margin, round
//! 6. Append the projection to the `stock` table
//!
//! # Modules
//!
//! - `adapters`: Tabular store contract and implementations (workbook, memory)
//! - `core`: Validator, surplus, forecast, coordinator and run journal
//! - `domain`: Data structures (ProductRecord, Event, Run)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Seed a workbook
//! restock init --headers cheese,ham,egg,tuna,chicken,turkey --stock 50,50,50,50,50,50
//!
//! # Record a market's sales
//! restock run --sales 10,20,30,40,50,60
//!
//! # Review past runs
//! restock runs
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{Cell, MemoryStore, StoreError, TabularStore, WorkbookStore};
pub use config::Settings;
pub use crate::core::{Coordinator, PipelineError, RunJournal};
pub use domain::{ProductRecord, Run, RunState, StockValues};
