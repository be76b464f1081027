//! Pipeline builder with validation.

use super::{Pipeline, RetryPolicy, StageSpec};
use crate::errors::PipelineValidationError;
use crate::stages::Stage;
use std::collections::HashSet;
use std::sync::Arc;

/// Builds a validated pipeline out of stage descriptors.
///
/// Stages are added in execution order. An upstream must already be present
/// when a stage that depends on it is added; together with the at-most-one
/// upstream per stage this keeps the dependency graph an acyclic chain by
/// construction.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    specs: Vec<StageSpec>,
    names: HashSet<String>,
    retry_policy: RetryPolicy,
}

impl PipelineBuilder {
    /// Creates a new builder for a named pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specs: Vec::new(),
            names: HashSet::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Adds a stage, using the name and upstream the stage declares.
    ///
    /// # Errors
    ///
    /// Returns an error on a duplicate stage name, an unknown upstream, or
    /// a self-dependency.
    pub fn stage(mut self, runner: Arc<dyn Stage>) -> Result<Self, PipelineValidationError> {
        let spec = StageSpec::new(runner);
        spec.validate()?;

        if self.names.contains(&spec.name) {
            return Err(PipelineValidationError::new(format!(
                "Duplicate stage name '{}'",
                spec.name
            ))
            .with_stages(vec![spec.name]));
        }

        if let Some(ref upstream) = spec.upstream {
            if !self.names.contains(upstream) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' depends on unknown stage '{}'",
                    spec.name, upstream
                ))
                .with_stages(vec![spec.name.clone(), upstream.clone()]));
            }
        }

        self.names.insert(spec.name.clone());
        self.specs.push(spec);
        Ok(self)
    }

    /// Overrides the advisory retry policy exposed to the scheduler.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.specs.len()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if no stages were added.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.specs.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages"));
        }
        Ok(Pipeline::from_parts(self.name, self.specs, self.retry_policy))
    }
}
