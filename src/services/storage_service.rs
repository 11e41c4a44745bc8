//! src/services/storage_service.rs
//!
//! StorageService: the six bucket/object actions of the emulator, addressed
//! by bucket name. It validates names and keys, resolves bucket names through
//! the `BucketStore` capability and hands bucket ids to the `ObjectStore`.
//! It never touches a concrete persistence type.

use crate::{
    models::bucket::Bucket,
    stores::{BucketStore, MemoryStore, ObjectStore, SqliteStore, StoreError, StoreResult},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

/// Result of creating a bucket.
#[derive(Debug, Clone)]
pub struct CreatedBucket {
    pub id: Uuid,
    pub name: String,
    /// Synthesized address, `<public-url>/<name>`.
    pub location: String,
}

/// Result of storing an object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub etag: String,
    pub content_type: String,
}

/// An object as returned to the emulation layer.
#[derive(Debug, Clone)]
pub struct ObjectContent {
    pub data: Bytes,
    pub content_type: String,
    pub etag: String,
    pub size_bytes: i64,
    pub last_modified: DateTime<Utc>,
}

#[derive(Clone)]
pub struct StorageService {
    buckets: Arc<dyn BucketStore>,
    objects: Arc<dyn ObjectStore>,

    /// Base URL used to synthesize bucket addresses.
    public_url: String,
}

impl StorageService {
    pub fn new(
        buckets: Arc<dyn BucketStore>,
        objects: Arc<dyn ObjectStore>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            buckets,
            objects,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Service over a shared SQLite pool.
    pub fn sqlite(db: Arc<SqlitePool>, public_url: impl Into<String>) -> Self {
        let store = Arc::new(SqliteStore::new(db));
        Self::new(store.clone(), store, public_url)
    }

    /// Service over a fresh in-memory store.
    pub fn in_memory(public_url: impl Into<String>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, public_url)
    }

    /// Address of a bucket as handed out to clients.
    pub fn bucket_address(&self, name: &str) -> String {
        format!("{}/{}", self.public_url, name)
    }

    /// Round trip to the storage collaborator, for readiness probes.
    pub async fn ping(&self) -> StoreResult<()> {
        self.buckets.ping().await
    }

    async fn fetch_bucket(&self, name: &str) -> StoreResult<Bucket> {
        ensure_bucket_name_safe(name)?;
        let bucket = self.buckets.get_by_name(name).await?;
        debug!(bucket = %bucket.name, bucket_id = %bucket.id, "resolved bucket");
        Ok(bucket)
    }

    /// Create a bucket. Returns `BucketAlreadyExists` if the name is taken.
    pub async fn create_bucket(&self, name: &str) -> StoreResult<CreatedBucket> {
        ensure_bucket_name_safe(name)?;
        let bucket = self.buckets.create(name).await?;
        info!(bucket = %bucket.name, bucket_id = %bucket.id, "created bucket");

        Ok(CreatedBucket {
            id: bucket.id,
            location: self.bucket_address(&bucket.name),
            name: bucket.name,
        })
    }

    /// Keys of every object in the named bucket.
    pub async fn list_objects(&self, bucket: &str) -> StoreResult<Vec<String>> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let keys = self
            .buckets
            .list_object_keys(bucket_rec.id)
            .await
            .map_err(|err| err.for_bucket(bucket))?;
        debug!(bucket, count = keys.len(), "listed objects");
        Ok(keys)
    }

    /// Remove a bucket together with all of its objects.
    pub async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        self.buckets
            .remove(bucket_rec.id)
            .await
            .map_err(|err| err.for_bucket(bucket))?;
        info!(bucket, bucket_id = %bucket_rec.id, "removed bucket");
        Ok(())
    }

    /// Store a new object. Existing keys are never overwritten.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> StoreResult<StoredObject> {
        ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self
            .objects
            .put(bucket_rec.id, key, &data)
            .await
            .map_err(|err| err.for_bucket(bucket))?;
        info!(
            bucket,
            key,
            etag = %object.etag,
            content_type = %object.content_type,
            size = object.size_bytes,
            "stored object"
        );

        Ok(StoredObject {
            key: object.key,
            etag: object.etag,
            content_type: object.content_type,
        })
    }

    /// Fetch an object's payload and metadata.
    pub async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectContent> {
        ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self
            .objects
            .get(bucket_rec.id, key)
            .await
            .map_err(|err| err.for_bucket(bucket))?;
        debug!(bucket, key, size = object.size_bytes, "fetched object");

        Ok(ObjectContent {
            data: Bytes::from(object.data),
            content_type: object.content_type,
            etag: object.etag,
            size_bytes: object.size_bytes,
            last_modified: object.last_modified,
        })
    }

    /// Whether `key` exists in the named bucket.
    pub async fn object_exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        self.buckets
            .object_key_exists(bucket_rec.id, key)
            .await
            .map_err(|err| err.for_bucket(bucket))
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        self.objects
            .remove(bucket_rec.id, key)
            .await
            .map_err(|err| err.for_bucket(bucket))?;
        info!(bucket, key, "removed object");
        Ok(())
    }
}

/// Reject empty keys and keys longer than 1024 bytes.
fn ensure_key_safe(key: &str) -> StoreResult<()> {
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StoreError::InvalidObjectKey);
    }
    Ok(())
}

/// Validate bucket name format.
///
/// Enforces S3-like naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
pub fn ensure_bucket_name_safe(name: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let len = name.len();
    if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, dots, and hyphens",
        ));
    }

    if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }

    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return Err(invalid(
            "cannot contain consecutive dots or dot-hyphen combinations",
        ));
    }

    if is_ipv4_like(name) {
        return Err(invalid("must not be formatted like an IP address"));
    }

    Ok(())
}

/// Check if a string matches IPv4-like dotted decimal form.
/// Rejects names formatted like `1.2.3.4`.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}
