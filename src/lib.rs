//! Local S3-style bucket emulator.
//!
//! Buckets and objects live in a durable collaborator (SQLite or memory)
//! behind the [`stores::BucketStore`] and [`stores::ObjectStore`] traits.
//! [`services::storage_service::StorageService`] exposes the bucket and
//! object actions by name, and [`routes::routes::routes`] serves them over
//! HTTP with S3-shaped headers.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod stores;

pub use services::storage_service::StorageService;
pub use stores::{BucketStore, MemoryStore, ObjectStore, SqliteStore, StoreError, StoreResult};
