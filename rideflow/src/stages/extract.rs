//! The extract stage.

use super::{Stage, StageReport, RAW_DATA_KEY};
use crate::errors::StageError;
use crate::run::RunContext;
use crate::table::Table;
use async_trait::async_trait;
use tracing::info;

/// Validates that the configured source exists, loads it to report a row
/// count, and publishes the original source location under `"raw_data"`.
///
/// The source is published as-is, not copied: after success the handoff
/// resolves to the unchanged source bytes. The stage also creates the
/// destination directory later stages materialize into.
#[derive(Debug, Default, Clone)]
pub struct ExtractStage;

impl ExtractStage {
    /// The stage name, as declared to the scheduler.
    pub const NAME: &'static str = "extract";

    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for ExtractStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageReport, StageError> {
        let source = &ctx.config().source_path;
        if !source.exists() {
            return Err(StageError::source_not_found(source.clone()));
        }

        // Loaded only for the row count; extraction does not reshape data.
        let table = Table::read_csv(source)?;
        tokio::fs::create_dir_all(&ctx.config().transformed_dir).await?;

        ctx.handoff()
            .publish(ctx.run_id(), RAW_DATA_KEY, source.clone(), Self::NAME);

        let message = format!("Extracted {} rows from {}", table.row_count(), source.display());
        info!(run_id = %ctx.run_id(), rows = table.row_count(), "{message}");

        Ok(StageReport::new(Self::NAME, "Extraction complete", message).with_rows(table.row_count()))
    }
}
