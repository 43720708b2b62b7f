//! Append-only run journal with file-based persistence.
//!
//! Events for every run go to one newline-delimited JSON (JSONL) file
//! for easy debugging/inspection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::domain::{Event, Run};

/// Errors reading or writing the journal
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed journal line {line}: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// JSONL journal of pipeline runs
#[derive(Debug, Clone)]
pub struct RunJournal {
    path: PathBuf,
}

impl RunJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> JournalError {
        JournalError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Append an event to the journal
    pub async fn append(&self, event: &Event) -> Result<(), JournalError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        let json = serde_json::to_string(event)?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        Ok(())
    }

    /// Replay all events in order
    pub async fn replay(&self) -> Result<Vec<Event>, JournalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await.map_err(|e| self.io_error(e))? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = serde_json::from_str(&line)
                .map_err(|source| JournalError::Malformed { line: line_no, source })?;
            events.push(event);
        }

        Ok(events)
    }

    /// Reconstruct a single run
    pub async fn run(&self, run_id: Uuid) -> Result<Option<Run>, JournalError> {
        let events: Vec<Event> = self
            .replay()
            .await?
            .into_iter()
            .filter(|e| e.run_id == run_id)
            .collect();

        Ok(Run::from_events(&events))
    }

    /// Most recent runs first (the journal is in append order)
    pub async fn runs(&self, limit: usize) -> Result<Vec<Run>, JournalError> {
        let mut order: Vec<Uuid> = Vec::new();
        let mut grouped: HashMap<Uuid, Vec<Event>> = HashMap::new();

        for event in self.replay().await? {
            if !grouped.contains_key(&event.run_id) {
                order.push(event.run_id);
            }
            grouped.entry(event.run_id).or_default().push(event);
        }

        Ok(order
            .iter()
            .rev()
            .filter_map(|id| grouped.get(id).and_then(|events| Run::from_events(events)))
            .take(limit)
            .collect())
    }
}
