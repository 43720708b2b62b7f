//! Workbook Integration Tests
//!
//! Runs the pipeline against the file-backed workbook and checks the
//! journal it leaves behind.

use std::path::Path;

use restock::adapters::{Cell, TabularStore, WorkbookStore};
use restock::config::Settings;
use restock::core::{Coordinator, RunJournal};
use restock::domain::{PipelineStep, ProductRecord, RunState};
use tempfile::TempDir;

const HEADERS: [&str; 6] = ["cheese", "ham", "egg", "tuna", "chicken", "turkey"];

async fn setup(temp: &TempDir) -> (Settings, WorkbookStore) {
    let settings = Settings::with_home(temp.path());
    let store = WorkbookStore::init(
        &settings.workbook,
        &settings.tables.all(),
        &HEADERS,
        &settings.tables.stock,
        Some(&[50, 50, 50, 50, 50, 50][..]),
    )
    .await
    .unwrap();

    (settings, store)
}

fn coordinator(settings: &Settings) -> Coordinator<WorkbookStore> {
    Coordinator::new(settings.clone(), WorkbookStore::open(&settings.workbook))
        .unwrap()
        .with_journal(RunJournal::new(&settings.journal))
}

#[tokio::test]
async fn test_run_persists_all_three_tables() {
    let temp = TempDir::new().unwrap();
    let (settings, store) = setup(&temp).await;

    let coordinator = coordinator(&settings);
    let sales = coordinator.validate_input("10,20,30,40,50,60").unwrap();
    let run = coordinator.run(sales).await.unwrap();

    assert_eq!(
        store.read_last_row("surplus").await.unwrap(),
        [40, 30, 20, 10, 0, -10].map(Cell::Number).to_vec()
    );
    assert_eq!(
        store.read_last_row("stock").await.unwrap(),
        [11, 22, 33, 44, 55, 66].map(Cell::Number).to_vec()
    );

    let values = coordinator
        .stock_values(run.forecast.as_ref().unwrap())
        .await
        .unwrap();
    assert_eq!(values.get("cheese"), Some(11));
    assert_eq!(values.get("turkey"), Some(66));
}

#[tokio::test]
async fn test_consecutive_runs_use_latest_stock() {
    let temp = TempDir::new().unwrap();
    let (settings, store) = setup(&temp).await;
    let coordinator = coordinator(&settings);

    coordinator
        .run(ProductRecord::new(vec![10, 20, 30, 40, 50, 60]))
        .await
        .unwrap();
    let second = coordinator
        .run(ProductRecord::new(vec![20, 20, 20, 20, 20, 20]))
        .await
        .unwrap();

    // Surplus is against the projection written by the first run
    assert_eq!(second.stock, Some(ProductRecord::new(vec![11, 22, 33, 44, 55, 66])));
    assert_eq!(second.surplus, Some(ProductRecord::new(vec![-9, 2, 13, 24, 35, 46])));

    // mean(10, 20) = 15 -> 16.5 -> 16 ; mean(30, 20) = 25 -> 27.5 -> 28
    assert_eq!(
        second.forecast,
        Some(ProductRecord::new(vec![16, 22, 28, 33, 38, 44]))
    );
    assert_eq!(
        store.read_last_n_of_column("sales", 0, 5).await.unwrap(),
        vec![10, 20]
    );
}

#[tokio::test]
async fn test_journal_reconstructs_runs() {
    let temp = TempDir::new().unwrap();
    let (settings, _store) = setup(&temp).await;
    let coordinator = coordinator(&settings);

    let run = coordinator
        .run(ProductRecord::new(vec![10, 20, 30, 40, 50, 60]))
        .await
        .unwrap();

    let journal = RunJournal::new(&settings.journal);
    let replayed = journal.run(run.id).await.unwrap().unwrap();

    assert_eq!(replayed.state, RunState::Completed);
    assert_eq!(replayed.completed_steps, PipelineStep::ALL.to_vec());
    assert_eq!(replayed.sales, run.sales);
    assert_eq!(replayed.surplus, run.surplus);
    assert_eq!(replayed.forecast, run.forecast);
}

#[tokio::test]
async fn test_failed_run_is_journaled() {
    let temp = TempDir::new().unwrap();
    let settings = Settings::with_home(temp.path());

    // Workbook was never initialized
    let coordinator = coordinator(&settings);
    let result = coordinator.run(ProductRecord::new(vec![1; 6])).await;
    assert!(result.is_err());

    let runs = RunJournal::new(&settings.journal).runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    match &runs[0].state {
        RunState::Failed { step, error } => {
            assert_eq!(*step, Some(PipelineStep::RecordSales));
            assert!(error.contains("sales"));
        }
        other => panic!("unexpected state: {:?}", other),
    }
    assert!(!Path::new(&settings.workbook).join("sales.jsonl").exists());
}
