//! Pipeline configuration.
//!
//! All paths and storage coordinates are explicit options passed into the
//! pipeline at construction, rather than process-wide constants. The defaults
//! reproduce the historical fixed layout; `namespace_per_run` opts out of the
//! shared transformed-file destination when callers need per-run isolation.

use crate::run::RunId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for an extract/transform/load pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Path of the source CSV file.
    pub source_path: PathBuf,
    /// Directory the transformed artifact is materialized into.
    pub transformed_dir: PathBuf,
    /// File name of the transformed artifact within `transformed_dir`.
    pub transformed_file_name: String,
    /// Destination bucket name at the storage collaborator.
    pub bucket_name: String,
    /// Destination object key within the bucket.
    pub object_key: String,
    /// Content-type label attached to the upload.
    pub content_type: String,
    /// When true, the transformed file name is suffixed with the run id so
    /// concurrent runs stop racing on a shared destination.
    pub namespace_per_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/uber.csv"),
            transformed_dir: PathBuf::from("data/data"),
            transformed_file_name: "uber_transformed.csv".to_string(),
            bucket_name: "uber_data_etl".to_string(),
            object_key: "uber_cleaned.csv".to_string(),
            content_type: "text/csv".to_string(),
            namespace_per_run: false,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with the default layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source file path.
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Sets the transformed artifact directory.
    #[must_use]
    pub fn with_transformed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transformed_dir = dir.into();
        self
    }

    /// Sets the transformed artifact file name.
    #[must_use]
    pub fn with_transformed_file_name(mut self, name: impl Into<String>) -> Self {
        self.transformed_file_name = name.into();
        self
    }

    /// Sets the destination bucket name.
    #[must_use]
    pub fn with_bucket_name(mut self, bucket: impl Into<String>) -> Self {
        self.bucket_name = bucket.into();
        self
    }

    /// Sets the destination object key.
    #[must_use]
    pub fn with_object_key(mut self, key: impl Into<String>) -> Self {
        self.object_key = key.into();
        self
    }

    /// Sets the content-type label.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Enables or disables per-run output namespacing.
    #[must_use]
    pub fn with_namespace_per_run(mut self, enabled: bool) -> Self {
        self.namespace_per_run = enabled;
        self
    }

    /// Returns the transformed artifact path for the given run.
    ///
    /// With the default configuration every run shares one destination and
    /// the last writer wins; with `namespace_per_run` the file name carries
    /// the run id.
    #[must_use]
    pub fn transformed_path(&self, run: RunId) -> PathBuf {
        if self.namespace_per_run {
            let file = Path::new(&self.transformed_file_name);
            let stem = file
                .file_stem()
                .map_or_else(|| self.transformed_file_name.clone(), |s| s.to_string_lossy().into_owned());
            let name = match file.extension() {
                Some(ext) => format!("{stem}.{run}.{}", ext.to_string_lossy()),
                None => format!("{stem}.{run}"),
            };
            self.transformed_dir.join(name)
        } else {
            self.transformed_dir.join(&self.transformed_file_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = PipelineConfig::default();

        assert_eq!(config.source_path, PathBuf::from("data/uber.csv"));
        assert_eq!(config.bucket_name, "uber_data_etl");
        assert_eq!(config.object_key, "uber_cleaned.csv");
        assert_eq!(config.content_type, "text/csv");
        assert!(!config.namespace_per_run);
    }

    #[test]
    fn test_builder_setters() {
        let config = PipelineConfig::new()
            .with_source_path("/tmp/in.csv")
            .with_transformed_dir("/tmp/out")
            .with_bucket_name("other-bucket");

        assert_eq!(config.source_path, PathBuf::from("/tmp/in.csv"));
        assert_eq!(config.transformed_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.bucket_name, "other-bucket");
    }

    #[test]
    fn test_shared_destination_is_run_independent() {
        let config = PipelineConfig::default();
        let a = config.transformed_path(RunId::new());
        let b = config.transformed_path(RunId::new());

        assert_eq!(a, b);
        assert_eq!(a, PathBuf::from("data/data/uber_transformed.csv"));
    }

    #[test]
    fn test_namespaced_destination_includes_run_id() {
        let config = PipelineConfig::default().with_namespace_per_run(true);
        let run = RunId::new();
        let path = config.transformed_path(run);

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("uber_transformed."));
        assert!(name.contains(&run.to_string()));
        assert!(name.ends_with(".csv"));

        assert_ne!(path, config.transformed_path(RunId::new()));
    }
}
