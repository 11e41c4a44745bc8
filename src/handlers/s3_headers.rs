//! Response headers every S3 endpoint carries.
//!
//! - `Server`, `Date`
//! - `x-amz-request-id`: MD5 hex of a fresh UUID
//! - `x-amz-id-2`: base64 of random bytes

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const STORAGE_CLASS: &str = "STANDARD";

const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn generate_request_id() -> String {
    format!("{:x}", md5::compute(Uuid::new_v4().as_bytes()))
}

fn generate_amz_id_2() -> String {
    let mut raw = Vec::with_capacity(32);
    raw.extend_from_slice(Uuid::new_v4().as_bytes());
    raw.extend_from_slice(Uuid::new_v4().as_bytes());
    general_purpose::STANDARD.encode(raw)
}

fn insert_emulation_headers(headers: &mut HeaderMap) {
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
    if let Ok(value) = HeaderValue::from_str(&http_date(&Utc::now())) {
        headers.insert(header::DATE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&generate_request_id()) {
        headers.insert(HeaderName::from_static("x-amz-request-id"), value);
    }
    if let Ok(value) = HeaderValue::from_str(&generate_amz_id_2()) {
        headers.insert(HeaderName::from_static("x-amz-id-2"), value);
    }
}

/// Middleware adding the emulation headers to every response, errors included.
pub async fn s3_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    insert_emulation_headers(response.headers_mut());
    response
}
