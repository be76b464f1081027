//! Run identity, run state, and the run-scoped context handed to stages.

use crate::config::PipelineConfig;
use crate::errors::StageErrorKind;
use crate::events::{EventSink, NoOpEventSink};
use crate::handoff::HandoffStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifies one execution attempt of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh run id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The state of a run as the runner drives it through the chain.
///
/// Terminal state is binary: a run as a whole either succeeded or failed.
/// There is no partial-success state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RunStatus {
    /// Created but not yet started.
    Pending,
    /// A stage is currently executing.
    Running {
        /// The name of the executing stage.
        stage: String,
    },
    /// Every stage completed successfully.
    Succeeded,
    /// A stage failed; downstream stages were skipped.
    Failed {
        /// The name of the failing stage.
        stage: String,
        /// The kind of error that failed the stage.
        error: StageErrorKind,
    },
}

impl RunStatus {
    /// Returns true if the run has reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// One execution attempt of the pipeline.
///
/// Created when the pipeline is triggered and mutated by the runner as
/// stages complete. The core never deletes runs; retention is an external
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// The run identifier.
    pub id: RunId,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// The current status.
    pub status: RunStatus,
}

impl Run {
    /// Creates a new pending run.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: RunId::new(),
            started_at: Utc::now(),
            status: RunStatus::Pending,
        }
    }

    /// Creates a pending run with a specific id.
    #[must_use]
    pub fn with_id(id: RunId) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            status: RunStatus::Pending,
        }
    }
}

impl Default for Run {
    fn default() -> Self {
        Self::new()
    }
}

/// The run-scoped context supplied to every stage.
///
/// This is the object the external scheduler threads through the pipeline:
/// it carries the run id, the configuration, the handoff store handle and
/// the event sink. Stages reach their upstream's output exclusively through
/// the handoff store on this context.
#[derive(Clone)]
pub struct RunContext {
    run_id: RunId,
    config: Arc<PipelineConfig>,
    handoff: Arc<HandoffStore>,
    event_sink: Arc<dyn EventSink>,
}

impl RunContext {
    /// Creates a run context.
    #[must_use]
    pub fn new(run_id: RunId, config: Arc<PipelineConfig>, handoff: Arc<HandoffStore>) -> Self {
        Self {
            run_id,
            config,
            handoff,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the handoff store.
    #[must_use]
    pub fn handoff(&self) -> &HandoffStore {
        &self.handoff
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Emits an event enriched with the run id.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));
        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert(
                "run_id".to_string(),
                serde_json::json!(self.run_id.to_string()),
            );
        }
        self.event_sink.try_emit(event_type, Some(enriched));
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;

    #[test]
    fn test_run_starts_pending() {
        let run = Run::new();
        assert_eq!(run.status, RunStatus::Pending);
        assert!(!run.status.is_terminal());
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunStatus::Succeeded.is_terminal());
        assert!(RunStatus::Failed {
            stage: "extract".to_string(),
            error: StageErrorKind::SourceNotFound,
        }
        .is_terminal());
        assert!(!RunStatus::Running {
            stage: "extract".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let status = RunStatus::Failed {
            stage: "extract".to_string(),
            error: StageErrorKind::SourceNotFound,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains(r#""state":"failed""#));
        assert!(json.contains(r#""error":"source_not_found""#));

        let back: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_context_event_enrichment() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = RunContext::new(
            RunId::new(),
            Arc::new(PipelineConfig::default()),
            Arc::new(HandoffStore::new()),
        )
        .with_event_sink(sink.clone());

        ctx.try_emit_event("stage.started", Some(serde_json::json!({"stage": "extract"})));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let data = events[0].1.as_ref().unwrap();
        assert_eq!(data["stage"], "extract");
        assert_eq!(data["run_id"], ctx.run_id().to_string());
    }
}
