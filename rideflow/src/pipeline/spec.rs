//! Stage descriptors and scheduler-facing metadata.

use crate::errors::PipelineValidationError;
use crate::stages::Stage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Static metadata for one stage in a pipeline: its name, its single
/// optional upstream dependency, and the callable behavior.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// The stage this one depends on, if any.
    pub upstream: Option<String>,
    /// The stage implementation.
    pub runner: Arc<dyn Stage>,
}

impl StageSpec {
    /// Creates a descriptor from a stage, taking the name and upstream the
    /// stage declares.
    #[must_use]
    pub fn new(runner: Arc<dyn Stage>) -> Self {
        Self {
            name: runner.name().to_string(),
            upstream: runner.upstream().map(str::to_string),
            runner,
        }
    }

    /// Validates the descriptor in isolation.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage depends on itself.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.upstream.as_deref() == Some(self.name.as_str()) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' cannot depend on itself",
                self.name
            ))
            .with_stages(vec![self.name.clone()]));
        }
        Ok(())
    }
}

/// Advisory retry metadata for the external scheduler.
///
/// The core never retries anything itself; stages are whole-stage
/// re-runnable and the scheduler owns retry counts and backoff timing. This
/// is the documented default it may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of whole-stage retries after the first failure.
    pub retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay: Duration::from_secs(5 * 60),
        }
    }
}
