//! HTTP handlers for object and bucket operations.
//! Bodies are buffered (objects live in the metadata database) and all
//! storage concerns are delegated to `StorageService`.

use crate::{
    errors::AppError,
    handlers::s3_headers::{STORAGE_CLASS, http_date},
    services::storage_service::{ObjectContent, StorageService},
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Region reported for every bucket.
const BUCKET_REGION: &str = "us-east-1";

/// Listing is never paginated; this is only echoed back as `MaxKeys`.
const LIST_MAX_KEYS: usize = 1000;

/// Form field that carries the file in `POST /{bucket}` uploads.
const UPLOAD_FORM_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub bucket: String,
    pub etag: String,
}

/// PUT `/{bucket}` — create bucket.
pub async fn create_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Response, AppError> {
    let created = service.create_bucket(&bucket).await?;

    let xml = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<CreateBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
            r#"<Location>{}</Location>"#,
            r#"<BucketId>{}</BucketId>"#,
            r#"</CreateBucketResult>"#
        ),
        xml_escape(&created.location),
        created.id
    );

    let mut response = Response::new(Body::from(xml));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );
    if let Ok(value) = HeaderValue::from_str(&created.location) {
        headers.insert(header::LOCATION, value);
    }
    Ok(response)
}

/// GET `/{bucket}` — list object keys.
pub async fn list_objects(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Response, AppError> {
    let keys = service.list_objects(&bucket).await?;
    let xml = build_list_bucket_xml(&bucket, &keys);

    let mut response = Response::new(Body::from(xml));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );
    headers.insert(
        HeaderName::from_static("x-amz-bucket-region"),
        HeaderValue::from_static(BUCKET_REGION),
    );
    Ok(response)
}

/// DELETE `/{bucket}` — delete bucket and every object in it.
pub async fn delete_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_bucket(&bucket).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT `/{bucket}/{*key}` — upload the raw request body as an object.
pub async fn upload_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, AppError> {
    let stored = service.put_object(&bucket, &key, body).await?;

    let mut response = Response::new(Body::empty());
    set_upload_headers(response.headers_mut(), &stored.etag);
    Ok(response)
}

/// POST `/{bucket}` — upload the `file` field of a multipart form, keyed by
/// its file name.
pub async fn upload_form(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.body_text()))?
    {
        if field.name() != Some(UPLOAD_FORM_FIELD) {
            continue;
        }

        let key = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("file part has no file name"))?;
        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?;

        let stored = service.put_object(&bucket, &key, data).await?;
        let mut response = Json(UploadResponse {
            key: stored.key,
            bucket,
            etag: stored.etag.clone(),
        })
        .into_response();
        set_upload_headers(response.headers_mut(), &stored.etag);
        return Ok(response);
    }

    Err(AppError::bad_request(
        "file is required, put 'file' in form",
    ))
}

/// GET `/{bucket}/{*key}` — object bytes with S3 object headers.
pub async fn get_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let object = service.get_object(&bucket, &key).await?;

    let mut response = Response::new(Body::empty());
    set_object_headers(response.headers_mut(), &object);
    *response.body_mut() = Body::from(object.data);
    Ok(response)
}

/// HEAD `/{bucket}/{*key}` — same headers as GET but no body.
pub async fn head_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let object = service.get_object(&bucket, &key).await?;
    let mut response = Response::new(Body::empty());
    set_object_headers(response.headers_mut(), &object);
    Ok(response)
}

/// DELETE `/{bucket}/{*key}` — remove an object.
pub async fn delete_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_object(&bucket, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn set_upload_headers(headers: &mut HeaderMap, etag: &str) {
    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
        headers.insert(header::ETAG, value);
    }
    headers.insert(
        HeaderName::from_static("x-amz-version-id"),
        HeaderValue::from_static("null"),
    );
    headers.insert(
        HeaderName::from_static("x-amz-storage-class"),
        HeaderValue::from_static(STORAGE_CLASS),
    );
}

fn set_object_headers(headers: &mut HeaderMap, object: &ObjectContent) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(object.size_bytes.max(0)),
    );

    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", object.etag)) {
        headers.insert(header::ETAG, value);
    }

    if let Ok(value) = HeaderValue::from_str(&http_date(&object.last_modified)) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        HeaderName::from_static("x-amz-storage-class"),
        HeaderValue::from_static(STORAGE_CLASS),
    );
}

fn build_list_bucket_xml(bucket: &str, keys: &[String]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
    );
    xml.push_str(&format!("<Name>{}</Name>", xml_escape(bucket)));
    xml.push_str("<Prefix></Prefix>");
    xml.push_str(&format!("<MaxKeys>{}</MaxKeys>", LIST_MAX_KEYS));
    xml.push_str(&format!("<KeyCount>{}</KeyCount>", keys.len()));
    xml.push_str("<IsTruncated>false</IsTruncated>");

    for key in keys {
        xml.push_str("<Contents>");
        xml.push_str(&format!("<Key>{}</Key>", xml_escape(key)));
        xml.push_str(&format!("<StorageClass>{}</StorageClass>", STORAGE_CLASS));
        xml.push_str("</Contents>");
    }

    xml.push_str("</ListBucketResult>");
    xml
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
