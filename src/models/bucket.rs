//! Represents a logical bucket, a top-level container for objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A storage bucket in the emulator.
///
/// Buckets act as namespaces for objects. Objects refer to their bucket by
/// `id`, never by `name`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Bucket {
    /// Surrogate identifier, assigned on creation and never reused.
    pub id: Uuid,

    /// Globally unique bucket name; the external addressing key.
    pub name: String,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,
}

impl Bucket {
    /// Build a fresh bucket record stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
