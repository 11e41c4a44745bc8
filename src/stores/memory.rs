//! In-memory collaborator.
//!
//! Provides a non-persistent store for embedding the emulator and for tests.
//! All state sits behind one `parking_lot::RwLock`; each operation is a single
//! critical section that never spans an `.await`, which gives the same
//! atomicity the SQLite collaborator gets from constraints and transactions.

use super::{BucketStore, ObjectStore, StoreError, StoreResult};
use crate::models::{bucket::Bucket, object::Object};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    buckets: HashMap<Uuid, Bucket>,
    /// Unique index on bucket name.
    names: HashMap<String, Uuid>,
    objects: HashMap<(Uuid, String), Object>,
}

impl MemoryState {
    fn missing_object(&self, bucket_id: Uuid, key: &str) -> StoreError {
        let elsewhere = self
            .objects
            .keys()
            .any(|(owner, k)| *owner != bucket_id && k == key);
        let bucket = bucket_id.to_string();
        let key = key.to_string();
        if elsewhere {
            StoreError::ObjectNotInBucket { bucket, key }
        } else {
            StoreError::ObjectNotFound { bucket, key }
        }
    }
}

/// Bucket and object store kept entirely in process memory.
///
/// `MemoryStore` is `Clone`; clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects across all buckets.
    pub fn object_count(&self) -> usize {
        self.state.read().objects.len()
    }
}

#[async_trait]
impl BucketStore for MemoryStore {
    async fn create(&self, name: &str) -> StoreResult<Bucket> {
        let bucket = Bucket::new(name);
        let mut guard = self.state.write();
        let state = &mut *guard;
        match state.names.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::BucketAlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(bucket.id);
                state.buckets.insert(bucket.id, bucket.clone());
                Ok(bucket)
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Bucket> {
        let state = self.state.read();
        state
            .names
            .get(name)
            .and_then(|id| state.buckets.get(id))
            .cloned()
            .ok_or_else(|| StoreError::BucketNotFound(name.to_string()))
    }

    async fn list_object_keys(&self, bucket_id: Uuid) -> StoreResult<Vec<String>> {
        let state = self.state.read();
        let mut keys: Vec<String> = state
            .objects
            .keys()
            .filter(|(owner, _)| *owner == bucket_id)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn object_key_exists(&self, bucket_id: Uuid, key: &str) -> StoreResult<bool> {
        let state = self.state.read();
        Ok(state.objects.contains_key(&(bucket_id, key.to_string())))
    }

    async fn remove(&self, bucket_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write();
        let bucket = state
            .buckets
            .remove(&bucket_id)
            .ok_or_else(|| StoreError::BucketNotFound(bucket_id.to_string()))?;
        state.names.remove(&bucket.name);
        state.objects.retain(|(owner, _), _| *owner != bucket_id);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, bucket_id: Uuid, key: &str, data: &[u8]) -> StoreResult<Object> {
        // Hash and sniff outside the lock.
        let object = Object::new(bucket_id, key, data.to_vec());

        let mut state = self.state.write();
        if !state.buckets.contains_key(&bucket_id) {
            return Err(StoreError::BucketNotFound(bucket_id.to_string()));
        }
        match state.objects.entry((bucket_id, key.to_string())) {
            Entry::Occupied(_) => Err(StoreError::ObjectAlreadyExists {
                bucket: bucket_id.to_string(),
                key: key.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(object.clone());
                Ok(object)
            }
        }
    }

    async fn get(&self, bucket_id: Uuid, key: &str) -> StoreResult<Object> {
        let state = self.state.read();
        match state.objects.get(&(bucket_id, key.to_string())) {
            Some(object) => Ok(object.clone()),
            None => Err(state.missing_object(bucket_id, key)),
        }
    }

    async fn remove(&self, bucket_id: Uuid, key: &str) -> StoreResult<()> {
        let mut state = self.state.write();
        match state.objects.remove(&(bucket_id, key.to_string())) {
            Some(_) => Ok(()),
            None => Err(state.missing_object(bucket_id, key)),
        }
    }
}
