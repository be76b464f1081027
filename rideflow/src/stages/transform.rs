//! The transform stage.

use super::{Stage, StageReport, RAW_DATA_KEY, TRANSFORMED_FILE_KEY};
use crate::errors::StageError;
use crate::run::RunContext;
use crate::table::Table;
use async_trait::async_trait;
use tracing::info;

/// Columns pruned from the artifact when present. Absence is not an error.
pub const DROP_COLUMNS: [&str; 9] = [
    "Customer Rating",
    "Avg VTAT",
    "Avg CTAT",
    "Cancelled Rides by Driver",
    "Driver Cancellation Reason",
    "Incomplete Rides",
    "Incomplete Rides Reason",
    "Cancelled Rides by Customer",
    "Reason for cancelling by Customer",
];

/// Numeric columns whose missing values are filled with the column median.
pub const MEDIAN_COLUMNS: [&str; 3] = ["Booking Value", "Ride Distance", "Driver Ratings"];

/// Categorical column whose missing values are filled with the column mode.
pub const MODE_COLUMN: &str = "Payment Method";

/// Cleans and reshapes the extracted artifact.
///
/// Consumes the `"raw_data"` reference, applies a deterministic,
/// order-sensitive sequence — prune, impute, rename, materialize — and
/// publishes the destination under `"transformed_file"` only after the file
/// is durably written. Medians and the mode are recomputed from the loaded
/// rows on every run.
#[derive(Debug, Default, Clone)]
pub struct TransformStage;

impl TransformStage {
    /// The stage name, as declared to the scheduler.
    pub const NAME: &'static str = "transform";

    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for TransformStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn upstream(&self) -> Option<&str> {
        Some(super::ExtractStage::NAME)
    }

    async fn execute(&self, ctx: &RunContext) -> Result<StageReport, StageError> {
        let raw_path = ctx.handoff().retrieve_existing(
            ctx.run_id(),
            RAW_DATA_KEY,
            super::ExtractStage::NAME,
        )?;

        let mut table = Table::read_csv(&raw_path)?;

        table.drop_columns(&DROP_COLUMNS);

        for column in MEDIAN_COLUMNS {
            let median = table.median(column)?;
            table.fill_missing(column, &median.to_string())?;
        }
        let mode = table.mode(MODE_COLUMN)?;
        table.fill_missing(MODE_COLUMN, &mode)?;

        table.normalize_headers();

        let destination = ctx.config().transformed_path(ctx.run_id());
        table.write_csv(&destination)?;

        // The artifact is flushed; only now may downstream see it.
        ctx.handoff().publish(
            ctx.run_id(),
            TRANSFORMED_FILE_KEY,
            destination.clone(),
            Self::NAME,
        );

        let message = format!("Transformed data saved to {}", destination.display());
        info!(run_id = %ctx.run_id(), rows = table.row_count(), "{message}");

        Ok(StageReport::new(Self::NAME, "Transformation complete", message)
            .with_rows(table.row_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::errors::StageErrorKind;
    use crate::handoff::HandoffStore;
    use crate::run::RunId;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Arc;

    const SOURCE: &str = "\
Booking ID,Booking Value,Ride Distance,Driver Ratings,Payment Method,Customer Rating
B1,100,5.0,4.5,UPI,4.1
B2,,7.0,4.0,Cash,3.9
B3,300,,,,4.8
";

    fn prepared_context(dir: &Path) -> RunContext {
        let source = dir.join("uber.csv");
        std::fs::write(&source, SOURCE).unwrap();

        let config = PipelineConfig::default()
            .with_source_path(&source)
            .with_transformed_dir(dir.join("out"));
        std::fs::create_dir_all(dir.join("out")).unwrap();

        let ctx = RunContext::new(RunId::new(), Arc::new(config), Arc::new(HandoffStore::new()));
        ctx.handoff()
            .publish(ctx.run_id(), RAW_DATA_KEY, source, super::super::ExtractStage::NAME);
        ctx
    }

    #[tokio::test]
    async fn test_transform_prunes_imputes_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = prepared_context(dir.path());

        let report = TransformStage::new().execute(&ctx).await.unwrap();
        assert_eq!(report.status, "Transformation complete");
        assert_eq!(report.rows, Some(3));

        let destination = ctx
            .handoff()
            .retrieve(ctx.run_id(), TRANSFORMED_FILE_KEY, TransformStage::NAME)
            .unwrap()
            .locator;
        let out = Table::read_csv(&destination).unwrap();

        // Dropped column gone, every header underscore-joined.
        assert_eq!(
            out.headers(),
            &[
                "Booking_ID",
                "Booking_Value",
                "Ride_Distance",
                "Driver_Ratings",
                "Payment_Method"
            ]
        );

        // Medians over the present values: 100/300 -> 200, 5/7 -> 6, 4.5/4 -> 4.25.
        assert_eq!(out.cell(1, 1), Some("200"));
        assert_eq!(out.cell(2, 2), Some("6"));
        assert_eq!(out.cell(2, 3), Some("4.25"));
        // Mode of {UPI, Cash} ties; first encountered wins.
        assert_eq!(out.cell(2, 4), Some("UPI"));
    }

    #[tokio::test]
    async fn test_transform_is_byte_identical_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = prepared_context(dir.path());

        TransformStage::new().execute(&ctx).await.unwrap();
        let destination = ctx
            .handoff()
            .retrieve(ctx.run_id(), TRANSFORMED_FILE_KEY, TransformStage::NAME)
            .unwrap()
            .locator;
        let first = std::fs::read(&destination).unwrap();

        TransformStage::new().execute(&ctx).await.unwrap();
        let second = std::fs::read(&destination).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_transform_without_extract_is_missing_handoff() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default().with_transformed_dir(dir.path());
        let ctx = RunContext::new(RunId::new(), Arc::new(config), Arc::new(HandoffStore::new()));

        let err = TransformStage::new().execute(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), StageErrorKind::MissingHandoff);
    }

    #[tokio::test]
    async fn test_transform_with_vanished_source() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = prepared_context(dir.path());
        std::fs::remove_file(dir.path().join("uber.csv")).unwrap();

        let err = TransformStage::new().execute(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), StageErrorKind::SourceNotFound);
        assert!(ctx
            .handoff()
            .retrieve(ctx.run_id(), TRANSFORMED_FILE_KEY, TransformStage::NAME)
            .is_err());
    }

    #[tokio::test]
    async fn test_transform_fails_fast_on_absent_imputed_column() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("uber.csv");
        std::fs::write(&source, "Booking ID\nB1\n").unwrap();

        let config = PipelineConfig::default()
            .with_source_path(&source)
            .with_transformed_dir(dir.path().join("out"));
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        let ctx = RunContext::new(RunId::new(), Arc::new(config), Arc::new(HandoffStore::new()));
        ctx.handoff()
            .publish(ctx.run_id(), RAW_DATA_KEY, source, "extract");

        let err = TransformStage::new().execute(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), StageErrorKind::TransformComputation);
        // A failed stage must not publish.
        assert!(ctx
            .handoff()
            .retrieve(ctx.run_id(), TRANSFORMED_FILE_KEY, TransformStage::NAME)
            .is_err());
    }
}
