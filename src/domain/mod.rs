//! Domain types for the restock pipeline.
//!
//! This module contains the core data structures:
//! - Records: fixed-width per-product quantities
//! - Events: journal entries for each run
//! - Run: pipeline execution state

pub mod events;
pub mod record;
pub mod run;

// Re-export commonly used types
pub use events::{Event, EventType, PipelineStep};
pub use record::{
    DimensionError, ForecastRecord, ProductRecord, SalesRecord, StockRecord, StockValues,
    SurplusRecord,
};
pub use run::{Run, RunState};
