//! Bucket and object stores.
//!
//! The stores are written against a durable collaborator that provides
//! atomic conditional inserts and transactional multi-row deletes. Two
//! collaborators ship with the crate:
//!
//! - [`SqliteStore`] backed by a shared `sqlx` SQLite pool.
//! - [`MemoryStore`] keeping everything in process, for embedding and tests.
//!
//! Neither keeps a cached copy of state: every call goes to the
//! collaborator, so several store instances over one pool stay consistent.

use crate::models::{bucket::Bucket, object::Object};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("object `{key}` already exists in bucket `{bucket}`")]
    ObjectAlreadyExists { bucket: String, key: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("object `{key}` does not belong to bucket `{bucket}`")]
    ObjectNotInBucket { bucket: String, key: String },
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Replace the bucket id a store reported with the name the caller used.
    pub(crate) fn for_bucket(self, name: &str) -> Self {
        match self {
            StoreError::BucketNotFound(_) => StoreError::BucketNotFound(name.to_string()),
            StoreError::ObjectAlreadyExists { key, .. } => StoreError::ObjectAlreadyExists {
                bucket: name.to_string(),
                key,
            },
            StoreError::ObjectNotFound { key, .. } => StoreError::ObjectNotFound {
                bucket: name.to_string(),
                key,
            },
            StoreError::ObjectNotInBucket { key, .. } => StoreError::ObjectNotInBucket {
                bucket: name.to_string(),
                key,
            },
            other => other,
        }
    }
}

/// Bucket identity and lifecycle.
#[async_trait]
pub trait BucketStore: Send + Sync + 'static {
    /// Insert a new bucket. The uniqueness check and the insert are one
    /// atomic operation; a lost race yields `BucketAlreadyExists`.
    async fn create(&self, name: &str) -> StoreResult<Bucket>;

    /// Exact-match lookup by name.
    async fn get_by_name(&self, name: &str) -> StoreResult<Bucket>;

    /// Keys of every object in the bucket, re-read on each call.
    async fn list_object_keys(&self, bucket_id: Uuid) -> StoreResult<Vec<String>>;

    async fn object_key_exists(&self, bucket_id: Uuid, key: &str) -> StoreResult<bool>;

    /// Delete every object of the bucket and then the bucket itself, as a
    /// single unit. Returns `BucketNotFound` if the bucket is already gone.
    async fn remove(&self, bucket_id: Uuid) -> StoreResult<()>;

    /// Cheap round trip to the collaborator.
    async fn ping(&self) -> StoreResult<()>;
}

/// Object identity, metadata derivation and content lifecycle.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Store a new object under `bucket_id`.
    ///
    /// Fails with `ObjectAlreadyExists` if the key is taken and with
    /// `BucketNotFound` if the bucket does not exist (or was removed
    /// concurrently). Existing objects are never overwritten.
    async fn put(&self, bucket_id: Uuid, key: &str, data: &[u8]) -> StoreResult<Object>;

    /// Fetch an object and its payload.
    ///
    /// A key that only exists under another bucket yields
    /// `ObjectNotInBucket`; the other bucket's data is never returned.
    async fn get(&self, bucket_id: Uuid, key: &str) -> StoreResult<Object>;

    async fn remove(&self, bucket_id: Uuid, key: &str) -> StoreResult<()>;
}
