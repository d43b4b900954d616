//! # contract: the object storage seam
//!
//! The core never talks to an SDK directly. Everything it needs from the store goes
//! through [`ObjectStore`]: list a bucket, upload one local file under a key, and
//! delete a batch of keys.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; `MockObjectStore` is exported with the
//!   `test-export-mocks` feature (on by default) so integration tests can script it.
//!
//! ## Implementors
//! - `keepa::storage::S3Store` for S3-compatible services.

use async_trait::async_trait;
use std::path::Path;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Boxed error returned by every store operation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// A listed object. Only the key matters to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
}

impl ObjectSummary {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Capability set the core requires from an object store.
///
/// The handle is shared read-only across all entries and both subsystems.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object currently in `bucket`.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, StoreError>;

    /// Upload the file at `local_path` to `bucket` under `key`.
    async fn upload_file(&self, local_path: &Path, bucket: &str, key: &str)
        -> Result<(), StoreError>;

    /// Delete all `keys` from `bucket` as one logical batch.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError>;
}
