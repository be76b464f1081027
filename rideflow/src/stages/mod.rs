//! Stage trait and the extract/transform/load implementations.
//!
//! Stages are the units of work the external scheduler invokes. Each stage
//! declares at most one upstream dependency, reads its input through the
//! handoff store, and publishes at most one downstream reference — and only
//! after it has finished successfully.

mod extract;
mod load;
mod transform;

pub use extract::ExtractStage;
pub use load::LoadStage;
pub use transform::TransformStage;

use crate::errors::StageError;
use crate::run::RunContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Handoff key the extract stage publishes the source location under.
pub const RAW_DATA_KEY: &str = "raw_data";

/// Handoff key the transform stage publishes the artifact location under.
pub const TRANSFORMED_FILE_KEY: &str = "transformed_file";

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns the name of the single upstream stage, if any.
    fn upstream(&self) -> Option<&str> {
        None
    }

    /// Executes the stage against the run-scoped context.
    ///
    /// # Errors
    ///
    /// Any error aborts the stage before it publishes a handoff entry and
    /// surfaces to the runner, which fails the run and skips downstream
    /// stages.
    async fn execute(&self, ctx: &RunContext) -> Result<StageReport, StageError>;
}

/// What a successfully completed stage reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// The stage name.
    pub stage: String,
    /// Short status string (e.g. "Extraction complete").
    pub status: String,
    /// Human-readable completion message. Not machine-parsed anywhere.
    pub message: String,
    /// Row count observed by the stage, where it loaded a table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

impl StageReport {
    /// Creates a report.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            status: status.into(),
            message: message.into(),
            rows: None,
        }
    }

    /// Attaches a row count.
    #[must_use]
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }
}
