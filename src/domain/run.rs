//! Run state and reconstruction from journal events.
//!
//! A Run represents one pass through the sales → surplus → forecast
//! pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{Event, EventType, PipelineStep};
use super::record::ProductRecord;

/// A single pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Current state of the run
    pub state: RunState,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (if applicable)
    pub completed_at: Option<DateTime<Utc>>,

    /// Steps completed so far, in order
    pub completed_steps: Vec<PipelineStep>,

    /// Sales record appended to the sales table
    pub sales: Option<ProductRecord>,

    /// Stock row the surplus was computed against
    pub stock: Option<ProductRecord>,

    /// Surplus record appended to the surplus table
    pub surplus: Option<ProductRecord>,

    /// Projection appended to the stock table
    pub forecast: Option<ProductRecord>,
}

impl Run {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: RunState::Running,
            started_at: Utc::now(),
            completed_at: None,
            completed_steps: Vec::new(),
            sales: None,
            stock: None,
            surplus: None,
            forecast: None,
        }
    }

    /// Reconstruct run state from its journal events
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let first_event = events.first()?;

        let mut run = Self::new(first_event.run_id);
        run.started_at = first_event.timestamp;

        let run_id = run.id;
        for event in events.iter().filter(|e| e.run_id == run_id) {
            run.apply_event(event);
        }

        Some(run)
    }

    /// Apply a single event to update run state
    pub fn apply_event(&mut self, event: &Event) {
        match event.event_type {
            EventType::RunStarted => {
                self.state = RunState::Running;
                self.started_at = event.timestamp;
            }
            EventType::StepCompleted => {
                let Some(step) = event.step else {
                    return;
                };

                if !self.completed_steps.contains(&step) {
                    self.completed_steps.push(step);
                }

                let slot = match step {
                    PipelineStep::RecordSales => &mut self.sales,
                    PipelineStep::ReadStock => &mut self.stock,
                    PipelineStep::RecordSurplus => &mut self.surplus,
                    PipelineStep::RecordForecast => &mut self.forecast,
                    _ => return,
                };
                if let Some(ref record) = event.record {
                    *slot = Some(record.clone());
                }
            }
            EventType::RunCompleted => {
                self.state = RunState::Completed;
                self.completed_at = Some(event.timestamp);
            }
            EventType::RunFailed => {
                self.state = RunState::Failed {
                    step: event.step,
                    error: event.error.clone().unwrap_or_default(),
                };
                self.completed_at = Some(event.timestamp);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    pub fn is_step_completed(&self, step: PipelineStep) -> bool {
        self.completed_steps.contains(&step)
    }

    /// First step that has not completed yet
    pub fn next_step(&self) -> Option<PipelineStep> {
        PipelineStep::ALL
            .into_iter()
            .find(|step| !self.is_step_completed(*step))
    }
}

/// State of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Currently executing
    Running,

    /// All steps completed
    Completed,

    /// Aborted; `step` is the step that failed
    Failed {
        step: Option<PipelineStep>,
        error: String,
    },
}

impl Default for RunState {
    fn default() -> Self {
        Self::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_event(run_id: Uuid, step: PipelineStep, values: Option<Vec<i64>>) -> Event {
        let event = Event::new(run_id, Some(step), EventType::StepCompleted, step.as_str());
        match values {
            Some(values) => event.with_record(ProductRecord::new(values)),
            None => event,
        }
    }

    #[test]
    fn test_run_creation() {
        let run_id = Uuid::new_v4();
        let run = Run::new(run_id);

        assert_eq!(run.id, run_id);
        assert!(run.is_running());
        assert_eq!(run.next_step(), Some(PipelineStep::RecordSales));
    }

    #[test]
    fn test_run_from_events() {
        let run_id = Uuid::new_v4();

        let events = vec![
            Event::new(run_id, None, EventType::RunStarted, "Run started"),
            step_event(run_id, PipelineStep::RecordSales, Some(vec![10, 20])),
            step_event(run_id, PipelineStep::ReadStock, Some(vec![50, 50])),
            step_event(run_id, PipelineStep::ComputeSurplus, None),
            step_event(run_id, PipelineStep::RecordSurplus, Some(vec![40, 30])),
            Event::new(run_id, None, EventType::RunCompleted, "Run completed"),
        ];

        let run = Run::from_events(&events).unwrap();

        assert_eq!(run.id, run_id);
        assert_eq!(run.state, RunState::Completed);
        assert!(run.is_step_completed(PipelineStep::ComputeSurplus));
        assert_eq!(run.sales, Some(ProductRecord::new(vec![10, 20])));
        assert_eq!(run.surplus, Some(ProductRecord::new(vec![40, 30])));
        assert_eq!(run.forecast, None);
        assert_eq!(run.next_step(), Some(PipelineStep::ReadHistory));
    }

    #[test]
    fn test_failed_run_keeps_failing_step() {
        let run_id = Uuid::new_v4();

        let events = vec![
            Event::new(run_id, None, EventType::RunStarted, "Run started"),
            step_event(run_id, PipelineStep::RecordSales, Some(vec![1])),
            Event::new(
                run_id,
                Some(PipelineStep::ReadStock),
                EventType::RunFailed,
                "Run failed",
            )
            .with_error("table 'stock' has no data rows".to_string()),
        ];

        let run = Run::from_events(&events).unwrap();

        assert_eq!(
            run.state,
            RunState::Failed {
                step: Some(PipelineStep::ReadStock),
                error: "table 'stock' has no data rows".to_string(),
            }
        );
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn test_from_events_empty() {
        assert!(Run::from_events(&[]).is_none());
    }

    #[test]
    fn test_from_events_ignores_other_runs() {
        let run_id = Uuid::new_v4();
        let other = Uuid::new_v4();

        let events = vec![
            Event::new(run_id, None, EventType::RunStarted, "Run started"),
            step_event(other, PipelineStep::RecordSales, Some(vec![99])),
            step_event(run_id, PipelineStep::RecordSales, Some(vec![7])),
            Event::new(other, None, EventType::RunCompleted, "Run completed"),
        ];

        let run = Run::from_events(&events).unwrap();

        assert_eq!(run.id, run_id);
        assert!(run.is_running());
        assert_eq!(run.sales, Some(ProductRecord::new(vec![7])));
        assert_eq!(run.completed_steps, vec![PipelineStep::RecordSales]);
    }
}
