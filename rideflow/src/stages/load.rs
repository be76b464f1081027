//! The load stage.

use super::{Stage, StageReport, TRANSFORMED_FILE_KEY};
use crate::errors::StageError;
use crate::run::RunContext;
use crate::storage::ObjectStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Hands the transformed artifact to the external storage collaborator.
///
/// Consumes the `"transformed_file"` reference and performs exactly one
/// upload per execution, addressed by the configured bucket, object key and
/// content type. A collaborator failure surfaces as an upload error and
/// leaves the transformed file untouched; the scheduler may re-run the whole
/// stage, so delivery is at-least-once.
pub struct LoadStage {
    store: Arc<dyn ObjectStore>,
}

impl LoadStage {
    /// The stage name, as declared to the scheduler.
    pub const NAME: &'static str = "load";

    /// Creates the stage with the given storage collaborator.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for LoadStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn upstream(&self) -> Option<&str> {
        Some(super::TransformStage::NAME)
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageReport, StageError> {
        let transformed = ctx.handoff().retrieve_existing(
            ctx.run_id(),
            TRANSFORMED_FILE_KEY,
            super::TransformStage::NAME,
        )?;

        let bytes = tokio::fs::read(&transformed).await?;
        let config = ctx.config();

        self.store
            .put(&config.bucket_name, &config.object_key, bytes, &config.content_type)
            .await
            .map_err(|e| {
                StageError::upload(&config.bucket_name, &config.object_key, e.to_string())
            })?;

        let message = format!(
            "Uploaded {} to bucket {}",
            config.object_key, config.bucket_name
        );
        info!(run_id = %ctx.run_id(), bucket = %config.bucket_name, key = %config.object_key, "{message}");

        Ok(StageReport::new(Self::NAME, "Upload complete", message))
    }
}
