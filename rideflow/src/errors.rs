//! Error types for the rideflow pipeline core.
//!
//! Stage failures are fatal to their stage: they abort before any handoff
//! publish and surface to the runner, which marks the run failed and skips
//! the remaining stages. Retry granularity is whole-stage and lives with the
//! external scheduler, never inside a stage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// An error raised while executing a single pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// The expected input file was absent when the stage started.
    #[error("source file not found: {path}")]
    SourceNotFound {
        /// The path that was expected to exist.
        path: PathBuf,
    },

    /// A referenced upstream handoff key was never published.
    #[error("no handoff entry '{key}' published by stage '{producer}'")]
    MissingHandoff {
        /// The handoff key that was requested.
        key: String,
        /// The stage that was expected to publish it.
        producer: String,
    },

    /// Imputation or projection failed during the transform stage.
    #[error("transform computation failed for column '{column}': {reason}")]
    TransformComputation {
        /// The column being processed.
        column: String,
        /// What went wrong.
        reason: String,
    },

    /// The external storage collaborator rejected or failed the upload.
    #[error("upload to bucket '{bucket}' key '{object}' failed: {reason}")]
    Upload {
        /// The destination bucket.
        bucket: String,
        /// The destination object key.
        object: String,
        /// The collaborator's failure message.
        reason: String,
    },

    /// An IO error while reading or materializing an artifact.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV parse or write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl StageError {
    /// Returns the machine-inspectable kind of this error.
    #[must_use]
    pub fn kind(&self) -> StageErrorKind {
        match self {
            Self::SourceNotFound { .. } => StageErrorKind::SourceNotFound,
            Self::MissingHandoff { .. } => StageErrorKind::MissingHandoff,
            Self::TransformComputation { .. } => StageErrorKind::TransformComputation,
            Self::Upload { .. } => StageErrorKind::Upload,
            Self::Io(_) => StageErrorKind::Io,
            Self::Csv(_) => StageErrorKind::Csv,
        }
    }

    /// Creates a source-not-found error.
    #[must_use]
    pub fn source_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SourceNotFound { path: path.into() }
    }

    /// Creates a missing-handoff error.
    #[must_use]
    pub fn missing_handoff(key: impl Into<String>, producer: impl Into<String>) -> Self {
        Self::MissingHandoff {
            key: key.into(),
            producer: producer.into(),
        }
    }

    /// Creates a transform-computation error.
    #[must_use]
    pub fn transform(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransformComputation {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Creates an upload error.
    #[must_use]
    pub fn upload(
        bucket: impl Into<String>,
        object: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Upload {
            bucket: bucket.into(),
            object: object.into(),
            reason: reason.into(),
        }
    }
}

/// The discriminant of a [`StageError`], used in run records and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// Expected input file absent at stage start.
    SourceNotFound,
    /// Referenced upstream key never published.
    MissingHandoff,
    /// Imputation or projection failed.
    TransformComputation,
    /// External storage call failed.
    Upload,
    /// IO failure.
    Io,
    /// CSV failure.
    Csv,
}

impl std::fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceNotFound => write!(f, "source_not_found"),
            Self::MissingHandoff => write!(f, "missing_handoff"),
            Self::TransformComputation => write!(f, "transform_computation"),
            Self::Upload => write!(f, "upload"),
            Self::Io => write!(f, "io"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Error raised when pipeline construction fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}
