//! The pipeline graph runner.
//!
//! Executes the stage chain sequentially, enforcing the dependency order:
//! a stage starts only after its upstream completed successfully, and a
//! failure skips every not-yet-started downstream stage. A run's terminal
//! state is binary succeeded/failed; there is no partial success.

use super::{RetryPolicy, StageSpec};
use crate::errors::StageError;
use crate::run::{Run, RunContext, RunStatus};
use crate::stages::{ExtractStage, LoadStage, StageReport, TransformStage};
use crate::storage::ObjectStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The outcome of driving one run through the chain.
#[derive(Debug)]
pub struct RunReport {
    /// The run with its terminal status.
    pub run: Run,
    /// Reports from the stages that completed.
    pub reports: Vec<StageReport>,
    /// Names of stages skipped because an upstream failed.
    pub skipped: Vec<String>,
    /// The error that failed the run, if it failed.
    pub error: Option<StageError>,
    /// Total execution time in milliseconds.
    pub duration_ms: f64,
}

impl RunReport {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.run.status, RunStatus::Succeeded)
    }
}

/// A validated chain of stages, executable once per run context.
pub struct Pipeline {
    name: String,
    specs: Vec<StageSpec>,
    retry_policy: RetryPolicy,
}

impl Pipeline {
    pub(super) fn from_parts(name: String, specs: Vec<StageSpec>, retry_policy: RetryPolicy) -> Self {
        Self {
            name,
            specs,
            retry_policy,
        }
    }

    /// Wires the extract → transform → load chain over the given storage
    /// collaborator.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain fails validation.
    pub fn etl(
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, crate::errors::PipelineValidationError> {
        super::PipelineBuilder::new("uber_etl")
            .stage(Arc::new(ExtractStage::new()))?
            .stage(Arc::new(TransformStage::new()))?
            .stage(Arc::new(LoadStage::new(store)))?
            .build()
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.specs.len()
    }

    /// Returns the stage names in declared execution order, for the
    /// external scheduler.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    /// Returns the advisory retry policy the scheduler may apply to failed
    /// stages. The runner itself never retries.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Drives one run through the chain.
    ///
    /// The run transitions `Pending → Running(stage) → … → Succeeded`, or to
    /// `Failed` from any running state. On failure the not-yet-started
    /// stages are skipped and the failing stage's error is attached to the
    /// report; no handoff entry from the failed stage exists.
    pub async fn run(&self, ctx: &RunContext) -> RunReport {
        let start = Instant::now();
        let mut run = Run::with_id(ctx.run_id());
        let mut reports = Vec::new();

        ctx.try_emit_event(
            "run.started",
            Some(serde_json::json!({ "pipeline": &self.name })),
        );

        for (position, spec) in self.specs.iter().enumerate() {
            run.status = RunStatus::Running {
                stage: spec.name.clone(),
            };
            ctx.try_emit_event(
                "stage.started",
                Some(serde_json::json!({ "stage": &spec.name })),
            );

            let stage_start = Instant::now();
            match spec.runner.execute(ctx).await {
                Ok(report) => {
                    ctx.try_emit_event(
                        "stage.completed",
                        Some(serde_json::json!({
                            "stage": &spec.name,
                            "status": &report.status,
                            "duration_ms": stage_start.elapsed().as_secs_f64() * 1000.0,
                        })),
                    );
                    info!(pipeline = %self.name, stage = %spec.name, status = %report.status, "stage completed");
                    reports.push(report);
                }
                Err(err) => {
                    ctx.try_emit_event(
                        "stage.failed",
                        Some(serde_json::json!({
                            "stage": &spec.name,
                            "error": err.to_string(),
                            "kind": err.kind(),
                            "duration_ms": stage_start.elapsed().as_secs_f64() * 1000.0,
                        })),
                    );
                    error!(pipeline = %self.name, stage = %spec.name, error = %err, "stage failed");

                    let skipped: Vec<String> = self.specs[position + 1..]
                        .iter()
                        .map(|s| s.name.clone())
                        .collect();
                    for name in &skipped {
                        ctx.try_emit_event(
                            "stage.skipped",
                            Some(serde_json::json!({
                                "stage": name,
                                "reason": format!("upstream stage '{}' failed", spec.name),
                            })),
                        );
                    }

                    run.status = RunStatus::Failed {
                        stage: spec.name.clone(),
                        error: err.kind(),
                    };
                    ctx.try_emit_event(
                        "run.failed",
                        Some(serde_json::json!({
                            "pipeline": &self.name,
                            "stage": &spec.name,
                            "kind": err.kind(),
                        })),
                    );

                    return RunReport {
                        run,
                        reports,
                        skipped,
                        error: Some(err),
                        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                    };
                }
            }
        }

        run.status = RunStatus::Succeeded;
        ctx.try_emit_event(
            "run.succeeded",
            Some(serde_json::json!({ "pipeline": &self.name })),
        );

        RunReport {
            run,
            reports,
            skipped: Vec::new(),
            error: None,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}
