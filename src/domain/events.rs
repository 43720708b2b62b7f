//! Journal events for pipeline runs.
//!
//! The journal is an audit trail of what each run did. It is never
//! replayed to resume a run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::ProductRecord;

/// A single entry in the run journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The run this event belongs to
    pub run_id: Uuid,

    /// Pipeline step (absent for run-level events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<PipelineStep>,

    /// Type of event
    pub event_type: EventType,

    /// Human-readable summary
    pub summary: String,

    /// Record produced or consumed by the step, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ProductRecord>,

    /// Time taken in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Event {
    /// Create a new event with the current timestamp
    pub fn new(
        run_id: Uuid,
        step: Option<PipelineStep>,
        event_type: EventType,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            run_id,
            step,
            event_type,
            summary: summary.into(),
            record: None,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_record(mut self, record: ProductRecord) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Types of journal events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunStarted,
    StepCompleted,
    RunCompleted,
    RunFailed,
}

/// The fixed, linear sequence of pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    /// Append the validated sales record to the sales table
    RecordSales,

    /// Read the latest row of the stock table
    ReadStock,

    /// Stock minus sales
    ComputeSurplus,

    /// Append the surplus record to the surplus table
    RecordSurplus,

    /// Read the trailing sales window per product column
    ReadHistory,

    /// Mean of the window plus margin, rounded
    ProjectStock,

    /// Append the projection to the stock table
    RecordForecast,
}

impl PipelineStep {
    /// Every step, in execution order
    pub const ALL: [PipelineStep; 7] = [
        PipelineStep::RecordSales,
        PipelineStep::ReadStock,
        PipelineStep::ComputeSurplus,
        PipelineStep::RecordSurplus,
        PipelineStep::ReadHistory,
        PipelineStep::ProjectStock,
        PipelineStep::RecordForecast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::RecordSales => "record_sales",
            PipelineStep::ReadStock => "read_stock",
            PipelineStep::ComputeSurplus => "compute_surplus",
            PipelineStep::RecordSurplus => "record_surplus",
            PipelineStep::ReadHistory => "read_history",
            PipelineStep::ProjectStock => "project_stock",
            PipelineStep::RecordForecast => "record_forecast",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::new(
            Uuid::new_v4(),
            Some(PipelineStep::RecordSales),
            EventType::StepCompleted,
            "Appended sales row",
        )
        .with_record(ProductRecord::new(vec![1, 2, 3]));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"step\":\"record_sales\""));
        assert!(json.contains("\"record\":[1,2,3]"));
        assert!(!json.contains("\"error\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type, EventType::StepCompleted);
        assert_eq!(parsed.step, Some(PipelineStep::RecordSales));
    }

    #[test]
    fn test_event_with_error() {
        let event = Event::new(Uuid::new_v4(), None, EventType::RunFailed, "Run failed")
            .with_error("table 'stock' not found".to_string());

        assert_eq!(event.error.as_deref(), Some("table 'stock' not found"));
    }

    #[test]
    fn test_steps_in_execution_order() {
        assert_eq!(PipelineStep::ALL.first(), Some(&PipelineStep::RecordSales));
        assert_eq!(PipelineStep::ALL.last(), Some(&PipelineStep::RecordForecast));
        assert_eq!(PipelineStep::ReadHistory.to_string(), "read_history");
    }
}
