//! Represents an object (file) stored in a bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::services::metadata::{compute_etag, detect_content_type};

/// Represents a single object (blob) within a bucket.
///
/// Unlike bucket records, objects carry their payload: the durable
/// collaborator stores the bytes next to the derived metadata so that a
/// bucket removal deletes both in one transaction.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Object {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Foreign key linking to the parent bucket.
    pub bucket_id: Uuid,

    /// Object key, unique within its bucket.
    pub key: String,

    /// Raw payload.
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Lowercase hex MD5 of `data`.
    pub etag: String,

    /// MIME type derived from `data` and `key` at write time.
    pub content_type: String,

    /// Size in bytes.
    pub size_bytes: i64,

    pub created_at: DateTime<Utc>,

    /// Equal to `created_at`; objects are never modified in place.
    pub last_modified: DateTime<Utc>,
}

impl Object {
    /// Build a new object record, deriving every piece of metadata from the
    /// payload and key.
    pub fn new(bucket_id: Uuid, key: impl Into<String>, data: Vec<u8>) -> Self {
        let key = key.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bucket_id,
            etag: compute_etag(&data),
            content_type: detect_content_type(&data, &key),
            size_bytes: data.len() as i64,
            key,
            data,
            created_at: now,
            last_modified: now,
        }
    }
}
