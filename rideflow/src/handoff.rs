//! The per-run handoff store.
//!
//! The store is the only channel between stages: a producing stage publishes
//! an opaque locator under a key after it has finished writing the artifact,
//! and exactly one downstream consumer retrieves it. Entries are scoped to a
//! single run; there is no cross-run visibility. The store never interprets
//! or validates a locator — consumers check file existence at the start of
//! their own execution.

use crate::errors::StageError;
use crate::run::RunId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single published key→locator mapping within one run.
#[derive(Debug, Clone)]
pub struct HandoffEntry {
    /// The stage-qualified key (e.g. `"raw_data"`).
    pub key: String,
    /// The opaque locator, a file path in this implementation.
    pub locator: PathBuf,
    /// The stage that published the entry.
    pub producer: String,
    /// When the entry was published.
    pub published_at: DateTime<Utc>,
}

/// A thread-safe key-value exchange scoped per run.
///
/// Publishing is visible immediately to any later retrieve within the same
/// run. Re-publishing a key overwrites the prior entry, so a whole-stage
/// re-run can republish its output.
#[derive(Debug, Default)]
pub struct HandoffStore {
    entries: RwLock<HashMap<RunId, HashMap<String, HandoffEntry>>>,
}

impl HandoffStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a locator under `key` for `run`, attributed to `producer`.
    pub fn publish(
        &self,
        run: RunId,
        key: impl Into<String>,
        locator: impl Into<PathBuf>,
        producer: impl Into<String>,
    ) {
        let key = key.into();
        let entry = HandoffEntry {
            key: key.clone(),
            locator: locator.into(),
            producer: producer.into(),
            published_at: Utc::now(),
        };
        self.entries.write().entry(run).or_default().insert(key, entry);
    }

    /// Retrieves the entry published under `key` for `run`.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::MissingHandoff`] if the key was never published
    /// for this run, either because `producer` never ran or because it
    /// failed before publishing.
    pub fn retrieve(&self, run: RunId, key: &str, producer: &str) -> Result<HandoffEntry, StageError> {
        self.entries
            .read()
            .get(&run)
            .and_then(|entries| entries.get(key))
            .cloned()
            .ok_or_else(|| StageError::missing_handoff(key, producer))
    }

    /// Retrieves the locator for `key`, verifying the referenced path still
    /// exists on disk.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::MissingHandoff`] if the key was never published,
    /// or [`StageError::SourceNotFound`] if the locator no longer resolves to
    /// a file.
    pub fn retrieve_existing(
        &self,
        run: RunId,
        key: &str,
        producer: &str,
    ) -> Result<PathBuf, StageError> {
        let entry = self.retrieve(run, key, producer)?;
        if !Path::new(&entry.locator).exists() {
            return Err(StageError::source_not_found(entry.locator));
        }
        Ok(entry.locator)
    }

    /// Discards every entry belonging to `run`.
    pub fn end_run(&self, run: RunId) {
        self.entries.write().remove(&run);
    }

    /// Returns the keys published for `run`.
    #[must_use]
    pub fn keys(&self, run: RunId) -> Vec<String> {
        self.entries
            .read()
            .get(&run)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of entries published for `run`.
    #[must_use]
    pub fn len(&self, run: RunId) -> usize {
        self.entries.read().get(&run).map_or(0, HashMap::len)
    }

    /// Returns true if nothing was published for `run`.
    #[must_use]
    pub fn is_empty(&self, run: RunId) -> bool {
        self.len(run) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageErrorKind;

    #[test]
    fn test_publish_then_retrieve() {
        let store = HandoffStore::new();
        let run = RunId::new();

        store.publish(run, "raw_data", "data/uber.csv", "extract");

        let entry = store.retrieve(run, "raw_data", "extract").unwrap();
        assert_eq!(entry.locator, PathBuf::from("data/uber.csv"));
        assert_eq!(entry.producer, "extract");
    }

    #[test]
    fn test_retrieve_unpublished_key() {
        let store = HandoffStore::new();
        let run = RunId::new();

        let err = store.retrieve(run, "raw_data", "extract").unwrap_err();
        assert_eq!(err.kind(), StageErrorKind::MissingHandoff);
    }

    #[test]
    fn test_no_cross_run_visibility() {
        let store = HandoffStore::new();
        let run_a = RunId::new();
        let run_b = RunId::new();

        store.publish(run_a, "raw_data", "data/uber.csv", "extract");

        assert!(store.retrieve(run_b, "raw_data", "extract").is_err());
        assert_eq!(store.len(run_a), 1);
        assert!(store.is_empty(run_b));
    }

    #[test]
    fn test_republish_overwrites() {
        let store = HandoffStore::new();
        let run = RunId::new();

        store.publish(run, "raw_data", "a.csv", "extract");
        store.publish(run, "raw_data", "b.csv", "extract");

        let entry = store.retrieve(run, "raw_data", "extract").unwrap();
        assert_eq!(entry.locator, PathBuf::from("b.csv"));
        assert_eq!(store.len(run), 1);
    }

    #[test]
    fn test_end_run_discards_entries() {
        let store = HandoffStore::new();
        let run = RunId::new();

        store.publish(run, "raw_data", "a.csv", "extract");
        store.publish(run, "transformed_file", "b.csv", "transform");
        store.end_run(run);

        assert!(store.is_empty(run));
        assert!(store.retrieve(run, "raw_data", "extract").is_err());
    }

    #[test]
    fn test_retrieve_existing_checks_disk() {
        let store = HandoffStore::new();
        let run = RunId::new();
        let dir = tempfile::tempdir().unwrap();

        let present = dir.path().join("present.csv");
        std::fs::write(&present, "a,b\n1,2\n").unwrap();
        store.publish(run, "raw_data", &present, "extract");
        assert_eq!(
            store.retrieve_existing(run, "raw_data", "extract").unwrap(),
            present
        );

        store.publish(run, "raw_data", dir.path().join("gone.csv"), "extract");
        let err = store.retrieve_existing(run, "raw_data", "extract").unwrap_err();
        assert_eq!(err.kind(), StageErrorKind::SourceNotFound);
    }
}
