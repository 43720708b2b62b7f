//! Core pipeline logic.
//!
//! This module contains:
//! - Validator: raw operator input to sales record
//! - Surplus: stock minus sales
//! - Forecast: trailing-window projection of next stock
//! - Coordinator: sequences a run against the tabular store
//! - Journal: append-only record of runs

pub mod coordinator;
pub mod forecast;
pub mod journal;
pub mod surplus;
pub mod validator;

// Re-export commonly used types
pub use coordinator::{Coordinator, PipelineError};
pub use forecast::{
    project_stock, project_window, round_half_even, EmptyHistoryError, ForecastError,
    HistoryWindow,
};
pub use journal::{JournalError, RunJournal};
pub use surplus::compute_surplus;
pub use validator::{split_tokens, validate, validate_line, ValidationError};
