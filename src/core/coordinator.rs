//! Pipeline coordinator.
//!
//! Sequences one run: record sales, reconcile against the latest stock
//! row, record the surplus, project the next stock from the trailing
//! sales window, record the projection. Steps run strictly in order and
//! the first failure aborts the rest; nothing is retried or resumed.
//! Journal writes never decide the outcome of a run: a failed write is
//! logged and the run carries on.

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{cells_to_integers, StoreError, TabularStore};
use crate::config::{ConfigError, Settings};
use crate::domain::{
    DimensionError, Event, EventType, PipelineStep, ProductRecord, Run, SalesRecord,
    StockRecord, StockValues,
};

use super::forecast::{project_window, ForecastError, HistoryWindow};
use super::journal::RunJournal;
use super::surplus::compute_surplus;
use super::validator::{validate_line, ValidationError};

/// Anything that aborts a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid settings: {0}")]
    Config(#[from] ConfigError),
}

/// Drives pipeline runs against a tabular store
pub struct Coordinator<S> {
    settings: Settings,
    store: S,
    journal: Option<RunJournal>,
}

impl<S: TabularStore> Coordinator<S> {
    /// Create a coordinator; settings are validated up front
    pub fn new(settings: Settings, store: S) -> Result<Self, PipelineError> {
        settings.validate()?;

        Ok(Self {
            settings,
            store,
            journal: None,
        })
    }

    /// Record every run in `journal`
    pub fn with_journal(mut self, journal: RunJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate one line of operator input against the configured width
    pub fn validate_input(&self, raw: &str) -> Result<SalesRecord, ValidationError> {
        validate_line(raw, self.settings.product_count)
    }

    /// Execute one end-to-end run for a validated sales record
    #[instrument(skip(self, sales), fields(store = self.store.name()))]
    pub async fn run(&self, sales: SalesRecord) -> Result<Run, PipelineError> {
        let run_id = Uuid::new_v4();
        info!(%run_id, "Starting pipeline run");

        let mut run = Run::new(run_id);
        let start_event = Event::new(run_id, None, EventType::RunStarted, "Run started");
        self.record(&mut run, start_event).await;

        match self.execute(&mut run, sales).await {
            Ok(()) => {
                let event = Event::new(run_id, None, EventType::RunCompleted, "Run completed");
                self.record(&mut run, event).await;

                info!(%run_id, "Run completed successfully");
                Ok(run)
            }
            Err(e) => {
                let failed_step = run.next_step();
                error!(%run_id, step = ?failed_step, error = %e, "Run failed");

                let event = Event::new(run_id, failed_step, EventType::RunFailed, "Run failed")
                    .with_error(e.to_string());

                self.record(&mut run, event).await;

                Err(e)
            }
        }
    }

    async fn execute(&self, run: &mut Run, sales: SalesRecord) -> Result<(), PipelineError> {
        let tables = &self.settings.tables;
        DimensionError::check(self.settings.product_count, sales.len())?;

        let started = Instant::now();
        self.store.append_row(&tables.sales, sales.values()).await?;
        self.step_done(run, PipelineStep::RecordSales, started, Some(&sales)).await;

        let started = Instant::now();
        let stock = self.read_stock().await?;
        self.step_done(run, PipelineStep::ReadStock, started, Some(&stock)).await;

        let started = Instant::now();
        let surplus = compute_surplus(&stock, &sales)?;
        self.step_done(run, PipelineStep::ComputeSurplus, started, None).await;

        let started = Instant::now();
        self.store
            .append_row(&tables.surplus, surplus.values())
            .await?;
        self.step_done(run, PipelineStep::RecordSurplus, started, Some(&surplus)).await;

        // Read after the sales append, so the window includes this session
        let started = Instant::now();
        let window = self.read_history().await?;
        debug!(depth = window.depth(), "Read sales history");
        self.step_done(run, PipelineStep::ReadHistory, started, None).await;

        let started = Instant::now();
        let forecast = project_window(&window, self.settings.margin)?;
        self.step_done(run, PipelineStep::ProjectStock, started, None).await;

        let started = Instant::now();
        self.store
            .append_row(&tables.stock, forecast.values())
            .await?;
        self.step_done(run, PipelineStep::RecordForecast, started, Some(&forecast)).await;

        Ok(())
    }

    /// Latest stock row as integers
    async fn read_stock(&self) -> Result<StockRecord, PipelineError> {
        let table = &self.settings.tables.stock;
        let row = self.store.read_last_row(table).await?;
        Ok(ProductRecord::new(cells_to_integers(table, &row)?))
    }

    /// Trailing window of every product column of the sales table
    async fn read_history(&self) -> Result<HistoryWindow, PipelineError> {
        let mut columns = Vec::with_capacity(self.settings.product_count);

        for column in 0..self.settings.product_count {
            let values = self
                .store
                .read_last_n_of_column(&self.settings.tables.sales, column, self.settings.window)
                .await?;
            columns.push(values);
        }

        Ok(HistoryWindow::new(columns))
    }

    /// Pair a record with the sales table headings
    pub async fn stock_values(&self, record: &ProductRecord) -> Result<StockValues, PipelineError> {
        let headings = self
            .store
            .read_header_row(&self.settings.tables.sales)
            .await?;

        Ok(StockValues::from_headings(&headings, record)?)
    }

    async fn step_done(
        &self,
        run: &mut Run,
        step: PipelineStep,
        started: Instant,
        record: Option<&ProductRecord>,
    ) {
        let duration_ms = started.elapsed().as_millis() as u64;
        debug!(%step, duration_ms, "Step completed");

        let mut event = Event::new(
            run.id,
            Some(step),
            EventType::StepCompleted,
            format!("Step '{}' completed", step),
        )
        .with_duration(duration_ms);
        if let Some(record) = record {
            event = event.with_record(record.clone());
        }

        self.record(run, event).await;
    }

    /// Apply an event to the run and journal it
    async fn record(&self, run: &mut Run, event: Event) {
        run.apply_event(&event);

        if let Some(ref journal) = self.journal {
            if let Err(e) = journal.append(&event).await {
                warn!(
                    run_id = %run.id,
                    event = ?event.event_type,
                    error = %e,
                    "Could not journal event"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Cell, MemoryStore};
    use crate::domain::RunState;
    use std::path::Path;

    const HEADERS: [&str; 3] = ["cheese", "ham", "egg"];

    fn settings() -> Settings {
        Settings {
            product_count: 3,
            ..Settings::with_home(Path::new("/unused"))
        }
    }

    fn seeded_store() -> MemoryStore {
        MemoryStore::new()
            .with_table("sales", &HEADERS)
            .with_table("surplus", &HEADERS)
            .with_table("stock", &HEADERS)
            .with_row("stock", vec![Cell::Number(20); 3])
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad = Settings { window: 0, ..settings() };
        assert!(matches!(
            Coordinator::new(bad, MemoryStore::new()),
            Err(PipelineError::Config(ConfigError::EmptyWindow))
        ));
    }

    #[tokio::test]
    async fn test_run_records_every_step() {
        let coordinator = Coordinator::new(settings(), seeded_store()).unwrap();
        let sales = coordinator.validate_input("5,20,25").unwrap();

        let run = coordinator.run(sales).await.unwrap();

        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.completed_steps, PipelineStep::ALL.to_vec());
        assert_eq!(run.surplus, Some(ProductRecord::new(vec![15, 0, -5])));
        assert_eq!(run.forecast, Some(ProductRecord::new(vec![6, 22, 28])));
    }

    #[tokio::test]
    async fn test_wrong_width_sales_never_appended() {
        let coordinator = Coordinator::new(settings(), seeded_store()).unwrap();

        let result = coordinator.run(ProductRecord::new(vec![1, 2])).await;

        assert!(matches!(
            result,
            Err(PipelineError::Dimension(DimensionError { expected: 3, actual: 2 }))
        ));
        assert!(coordinator.store().rows("sales").is_empty());
    }

    #[tokio::test]
    async fn test_stock_values_use_sales_headings() {
        let coordinator = Coordinator::new(settings(), seeded_store()).unwrap();

        let values = coordinator
            .stock_values(&ProductRecord::new(vec![6, 22, 28]))
            .await
            .unwrap();
        assert_eq!(values.get("ham"), Some(22));
    }

    /// A journal path whose parent is a regular file, so every append fails
    fn unwritable_journal(temp: &tempfile::TempDir) -> RunJournal {
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        RunJournal::new(blocker.join("runs.jsonl"))
    }

    #[tokio::test]
    async fn test_journal_failure_does_not_abort_run() {
        let temp = tempfile::TempDir::new().unwrap();
        let coordinator = Coordinator::new(settings(), seeded_store())
            .unwrap()
            .with_journal(unwritable_journal(&temp));

        let run = coordinator
            .run(ProductRecord::new(vec![5, 20, 25]))
            .await
            .unwrap();

        assert_eq!(run.state, RunState::Completed);
        let store = coordinator.store();
        assert_eq!(store.rows("sales").len(), 1);
        assert_eq!(store.rows("surplus").len(), 1);
        assert_eq!(store.rows("stock").len(), 2);
    }

    #[tokio::test]
    async fn test_store_error_survives_journal_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = seeded_store();
        store.fail_table("surplus");
        let coordinator = Coordinator::new(settings(), store)
            .unwrap()
            .with_journal(unwritable_journal(&temp));

        let result = coordinator.run(ProductRecord::new(vec![5, 20, 25])).await;

        assert!(matches!(
            result,
            Err(PipelineError::Store(StoreError::Unavailable(_)))
        ));
        assert_eq!(coordinator.store().rows("sales").len(), 1);
        assert_eq!(coordinator.store().rows("stock").len(), 1);
    }
}
