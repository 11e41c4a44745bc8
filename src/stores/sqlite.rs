//! src/stores/sqlite.rs
//!
//! SQLite collaborator for the bucket and object stores. Payloads live in the
//! `objects` table next to their metadata, so the unique constraints, the
//! foreign key to `buckets` and a single transaction are enough to keep every
//! invariant without in-process locking.

use super::{BucketStore, ObjectStore, StoreError, StoreResult};
use crate::models::{bucket::Bucket, object::Object};
use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    error::ErrorKind,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

const INIT_MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

const OBJECT_COLUMNS: &str =
    "id, bucket_id, key, data, etag, content_type, size_bytes, created_at, last_modified";

/// Open a SQLite pool with foreign keys enforced and WAL journaling.
///
/// The database file is created if it does not exist yet.
pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Apply the embedded schema. Every statement is idempotent.
pub async fn run_migrations(db: &SqlitePool) -> StoreResult<()> {
    let statements = INIT_MIGRATION
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

/// Bucket and object store over a shared SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    /// Shared SQLite connection pool, owned by the process entry point.
    db: Arc<SqlitePool>,
}

impl SqliteStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Classify a miss on `(bucket_id, key)`: the key either does not exist at
    /// all or only exists under some other bucket.
    async fn missing_object(&self, bucket_id: Uuid, key: &str) -> StoreError {
        let elsewhere = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM objects WHERE key = ? AND bucket_id <> ?)",
        )
        .bind(key)
        .bind(bucket_id)
        .fetch_one(&*self.db)
        .await;

        let bucket = bucket_id.to_string();
        let key = key.to_string();
        match elsewhere {
            Ok(true) => StoreError::ObjectNotInBucket { bucket, key },
            Ok(false) => StoreError::ObjectNotFound { bucket, key },
            Err(err) => StoreError::StorageUnavailable(err),
        }
    }
}

#[async_trait]
impl BucketStore for SqliteStore {
    async fn create(&self, name: &str) -> StoreResult<Bucket> {
        let bucket = Bucket::new(name);

        match sqlx::query("INSERT INTO buckets (id, name, created_at) VALUES (?, ?, ?)")
            .bind(bucket.id)
            .bind(&bucket.name)
            .bind(bucket.created_at)
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(bucket),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::BucketAlreadyExists(name.to_string()))
            }
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Bucket> {
        sqlx::query_as::<_, Bucket>("SELECT id, name, created_at FROM buckets WHERE name = ?")
            .bind(name)
            .fetch_optional(&*self.db)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::BucketNotFound(name.to_string()))
    }

    async fn list_object_keys(&self, bucket_id: Uuid) -> StoreResult<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM objects WHERE bucket_id = ? ORDER BY key ASC",
        )
        .bind(bucket_id)
        .fetch_all(&*self.db)
        .await
        .map_err(unavailable)?;
        Ok(keys)
    }

    async fn object_key_exists(&self, bucket_id: Uuid, key: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM objects WHERE bucket_id = ? AND key = ?)",
        )
        .bind(bucket_id)
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(unavailable)?;
        Ok(exists)
    }

    async fn remove(&self, bucket_id: Uuid) -> StoreResult<()> {
        // Dropping `tx` without commit rolls back both deletes.
        let mut tx = self.db.begin().await.map_err(unavailable)?;

        let objects = sqlx::query("DELETE FROM objects WHERE bucket_id = ?")
            .bind(bucket_id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        let buckets = sqlx::query("DELETE FROM buckets WHERE id = ?")
            .bind(bucket_id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        if buckets.rows_affected() == 0 {
            return Err(StoreError::BucketNotFound(bucket_id.to_string()));
        }

        tx.commit().await.map_err(unavailable)?;
        debug!(
            %bucket_id,
            objects = objects.rows_affected(),
            "removed bucket row and its objects"
        );
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for SqliteStore {
    async fn put(&self, bucket_id: Uuid, key: &str, data: &[u8]) -> StoreResult<Object> {
        let object = Object::new(bucket_id, key, data.to_vec());

        let insert = sqlx::query(&format!(
            "INSERT INTO objects ({OBJECT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(object.id)
        .bind(object.bucket_id)
        .bind(&object.key)
        .bind(&object.data)
        .bind(&object.etag)
        .bind(&object.content_type)
        .bind(object.size_bytes)
        .bind(object.created_at)
        .bind(object.last_modified)
        .execute(&*self.db)
        .await;

        match insert {
            Ok(_) => Ok(object),
            Err(err) if is_unique_violation(&err) => Err(StoreError::ObjectAlreadyExists {
                bucket: bucket_id.to_string(),
                key: key.to_string(),
            }),
            Err(err) if is_foreign_key_violation(&err) => {
                Err(StoreError::BucketNotFound(bucket_id.to_string()))
            }
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn get(&self, bucket_id: Uuid, key: &str) -> StoreResult<Object> {
        let found = sqlx::query_as::<_, Object>(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE bucket_id = ? AND key = ?"
        ))
        .bind(bucket_id)
        .bind(key)
        .fetch_optional(&*self.db)
        .await
        .map_err(unavailable)?;

        match found {
            Some(object) => Ok(object),
            None => Err(self.missing_object(bucket_id, key).await),
        }
    }

    async fn remove(&self, bucket_id: Uuid, key: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM objects WHERE bucket_id = ? AND key = ?")
            .bind(bucket_id)
            .bind(key)
            .execute(&*self.db)
            .await
            .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(self.missing_object(bucket_id, key).await);
        }
        Ok(())
    }
}

/// Pass a collaborator failure through untouched, logging it once.
fn unavailable(err: sqlx::Error) -> StoreError {
    warn!(error = %err, "sqlite collaborator failed");
    StoreError::StorageUnavailable(err)
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.kind() == ErrorKind::UniqueViolation
    )
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.kind() == ErrorKind::ForeignKeyViolation
    )
}
