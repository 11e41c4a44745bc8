#![allow(dead_code)]

use bucket_emulator::{
    BucketStore, MemoryStore, ObjectStore, SqliteStore, StorageService, stores::sqlite,
};
use std::sync::Arc;
use tempfile::TempDir;

pub const PUBLIC_URL: &str = "http://localhost:7777";

/// PNG signature followed by the start of an IHDR chunk.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01";

/// Stores under test plus whatever must outlive them.
pub struct Harness {
    pub buckets: Arc<dyn BucketStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub service: StorageService,
    _tmp: Option<TempDir>,
}

pub fn memory() -> Harness {
    let store = Arc::new(MemoryStore::new());
    Harness {
        buckets: store.clone(),
        objects: store.clone(),
        service: StorageService::new(store.clone(), store, PUBLIC_URL),
        _tmp: None,
    }
}

pub async fn sqlite() -> Harness {
    let tmp = TempDir::new().unwrap();
    let url = format!("sqlite://{}", tmp.path().join("test.db").display());
    let pool = sqlite::connect(&url, 8).await.unwrap();
    sqlite::run_migrations(&pool).await.unwrap();

    let store = Arc::new(SqliteStore::new(Arc::new(pool)));
    Harness {
        buckets: store.clone(),
        objects: store.clone(),
        service: StorageService::new(store.clone(), store, PUBLIC_URL),
        _tmp: Some(tmp),
    }
}

/// One harness per collaborator.
pub async fn all() -> Vec<(&'static str, Harness)> {
    vec![("memory", memory()), ("sqlite", sqlite().await)]
}
