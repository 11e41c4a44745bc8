//! Defines routes for all S3-like bucket and object operations.
//!
//! ## Structure
//! - **Bucket-level endpoints**
//!   - `PUT    /{bucket}` — create bucket
//!   - `GET    /{bucket}` — list object keys
//!   - `POST   /{bucket}` — upload the `file` field of a multipart form
//!   - `DELETE /{bucket}` — delete bucket and its objects
//!
//! - **Object-level endpoints**
//!   - `PUT    /{bucket}/{*key}` — upload object (raw body)
//!   - `GET    /{bucket}/{*key}` — download object
//!   - `HEAD   /{bucket}/{*key}` — retrieve headers only
//!   - `DELETE /{bucket}/{*key}` — delete object
//!
//! - **Probes**: `GET /_healthz`, `GET /_readyz`
//!
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::{
            create_bucket, delete_bucket, delete_object, get_object, head_object, list_objects,
            upload_form, upload_object,
        },
        s3_headers::s3_headers,
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, put},
};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Build and return the router for all S3-compatible routes.
///
/// The router carries shared state (`StorageService`) to all handlers and
/// stamps the emulation headers on every response.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // `_` never appears in a bucket name, so these can't shadow `/{bucket}`
        .route("/_healthz", get(healthz))
        .route("/_readyz", get(readyz))
        // Object-level routes
        .route(
            "/{bucket}/{*key}",
            put(upload_object)
                .get(get_object)
                .head(head_object)
                .delete(delete_object),
        )
        // Bucket-level routes
        .route(
            "/{bucket}",
            get(list_objects)
                .put(create_bucket)
                .post(upload_form)
                .delete(delete_bucket),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(s3_headers))
}
