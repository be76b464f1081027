//! The object-storage boundary.
//!
//! The load stage hands the transformed artifact to an [`ObjectStore`]
//! collaborator and treats its failure as a stage error. Delivery is
//! at-least-once: the store may receive the same object again when the
//! scheduler re-runs the load stage.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Error reported by an object-storage collaborator.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ObjectStoreError {
    /// The collaborator's failure message.
    pub message: String,
}

impl ObjectStoreError {
    /// Creates a new object store error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A client that uploads named bytes, with a content-type label, to a named
/// bucket under a named key. Last write wins; there is no versioning.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `bytes` to `bucket` under `key` with the given content type.
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator rejects or fails the upload.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;
}

/// A stored object held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// The object bytes.
    pub bytes: Vec<u8>,
    /// The content-type label the object was uploaded with.
    pub content_type: String,
}

/// An in-memory object store for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    put_count: RwLock<usize>,
    fail_with: RwLock<Option<String>>,
}

impl MemoryObjectStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `put` fail with the given message, simulating
    /// a transient collaborator outage.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.write() = Some(message.into());
    }

    /// Clears a previously configured failure.
    pub fn recover(&self) {
        *self.fail_with.write() = None;
    }

    /// Returns the object stored under `bucket`/`key`, if any.
    #[must_use]
    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Returns how many `put` calls were attempted, including failed ones.
    #[must_use]
    pub fn put_count(&self) -> usize {
        *self.put_count.read()
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        *self.put_count.write() += 1;

        if let Some(message) = self.fail_with.read().clone() {
            return Err(ObjectStoreError::new(message));
        }

        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// An object store speaking the GCS JSON media-upload API.
#[cfg(feature = "gcs")]
pub struct GcsObjectStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[cfg(feature = "gcs")]
impl GcsObjectStore {
    /// Creates a client against the public GCS endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://storage.googleapis.com".to_string(),
            token: None,
        }
    }

    /// Sets a bearer token for authenticated uploads.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the endpoint, for emulators and tests.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[cfg(feature = "gcs")]
impl Default for GcsObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "gcs")]
#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let url = format!(
            "{}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={key}",
            self.base_url
        );

        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ObjectStoreError::new(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ObjectStoreError::new(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
