//! End-to-end HTTP behaviour through the axum router.

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use bucket_emulator::{StorageService, StoreError, routes::routes::routes};
use common::{PNG_BYTES, PUBLIC_URL};
use serde_json::Value;
use tower::ServiceExt;

fn app() -> Router {
    routes().with_state(StorageService::in_memory(PUBLIC_URL))
}

async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn header_str<'a>(response: &'a Response, name: &str) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

#[tokio::test]
async fn test_create_bucket_returns_location() {
    let app = app();
    let response = send(&app, Method::PUT, "/photos", Body::empty()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "location"), "http://localhost:7777/photos");
    assert_eq!(header_str(&response, "content-type"), "application/xml");

    let xml = body_text(response).await;
    assert!(xml.contains("<Location>http://localhost:7777/photos</Location>"));
    assert!(xml.contains("<BucketId>"));
}

#[tokio::test]
async fn test_duplicate_bucket_conflicts() {
    let app = app();
    send(&app, Method::PUT, "/photos", Body::empty()).await;

    let response = send(&app, Method::PUT, "/photos", Body::empty()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BucketAlreadyExists");
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn test_invalid_bucket_name_rejected() {
    let app = app();
    let response = send(&app, Method::PUT, "/Not_Valid", Body::empty()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "InvalidBucketName");
}

#[tokio::test]
async fn test_put_get_head_object() {
    let app = app();
    send(&app, Method::PUT, "/photos", Body::empty()).await;

    let put = send(&app, Method::PUT, "/photos/cat.png", PNG_BYTES).await;
    assert_eq!(put.status(), StatusCode::OK);
    let etag = header_str(&put, "etag").to_string();
    assert_eq!(etag, format!("\"{:x}\"", md5::compute(PNG_BYTES)));
    assert_eq!(header_str(&put, "x-amz-version-id"), "null");

    let get = send(&app, Method::GET, "/photos/cat.png", Body::empty()).await;
    assert_eq!(get.status(), StatusCode::OK);
    assert_eq!(header_str(&get, "content-type"), "image/png");
    assert_eq!(header_str(&get, "etag"), etag);
    assert_eq!(
        header_str(&get, "content-length"),
        PNG_BYTES.len().to_string()
    );
    assert!(header_str(&get, "last-modified").ends_with(" GMT"));
    assert_eq!(header_str(&get, "x-amz-storage-class"), "STANDARD");
    let bytes = to_bytes(get.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], PNG_BYTES);

    let head = send(&app, Method::HEAD, "/photos/cat.png", Body::empty()).await;
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(header_str(&head, "etag"), etag);
    assert_eq!(header_str(&head, "content-type"), "image/png");
}

#[tokio::test]
async fn test_nested_keys_and_listing() {
    let app = app();
    send(&app, Method::PUT, "/photos", Body::empty()).await;
    send(&app, Method::PUT, "/photos/2025/trip/beach.png", PNG_BYTES).await;
    send(&app, Method::PUT, "/photos/notes.txt", "hello").await;

    let list = send(&app, Method::GET, "/photos", Body::empty()).await;
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(header_str(&list, "x-amz-bucket-region"), "us-east-1");
    let xml = body_text(list).await;
    assert!(xml.contains("<Name>photos</Name>"));
    assert!(xml.contains("<KeyCount>2</KeyCount>"));
    assert!(xml.contains("<Key>2025/trip/beach.png</Key>"));
    assert!(xml.contains("<Key>notes.txt</Key>"));

    let get = send(&app, Method::GET, "/photos/notes.txt", Body::empty()).await;
    assert_eq!(header_str(&get, "content-type"), "text/plain");
    assert_eq!(body_text(get).await, "hello");
}

#[tokio::test]
async fn test_put_existing_key_conflicts() {
    let app = app();
    send(&app, Method::PUT, "/docs", Body::empty()).await;
    send(&app, Method::PUT, "/docs/a.txt", "first").await;

    let again = send(&app, Method::PUT, "/docs/a.txt", "second").await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(again).await["code"], "ObjectAlreadyExists");

    let get = send(&app, Method::GET, "/docs/a.txt", Body::empty()).await;
    assert_eq!(body_text(get).await, "first");
}

#[tokio::test]
async fn test_multipart_upload() {
    let app = app();
    send(&app, Method::PUT, "/photos", Body::empty()).await;

    let mut form = Vec::new();
    form.extend_from_slice(b"--X\r\n");
    form.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"cat.png\"\r\n",
    );
    form.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    form.extend_from_slice(PNG_BYTES);
    form.extend_from_slice(b"\r\n--X--\r\n");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/photos")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
        .body(Body::from(form))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("etag"));
    let body = body_json(response).await;
    assert_eq!(body["key"], "cat.png");
    assert_eq!(body["bucket"], "photos");
    assert_eq!(body["etag"], format!("{:x}", md5::compute(PNG_BYTES)));

    let get = send(&app, Method::GET, "/photos/cat.png", Body::empty()).await;
    assert_eq!(header_str(&get, "content-type"), "image/png");
}

#[tokio::test]
async fn test_multipart_without_file_field() {
    let app = app();
    send(&app, Method::PUT, "/photos", Body::empty()).await;

    let form = b"--X\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--X--\r\n";
    let request = Request::builder()
        .method(Method::POST)
        .uri("/photos")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
        .body(Body::from(form.to_vec()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_object_and_bucket() {
    let app = app();
    send(&app, Method::PUT, "/photos", Body::empty()).await;
    send(&app, Method::PUT, "/photos/a.png", PNG_BYTES).await;
    send(&app, Method::PUT, "/photos/b.png", PNG_BYTES).await;

    let deleted = send(&app, Method::DELETE, "/photos/a.png", Body::empty()).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let missing = send(&app, Method::GET, "/photos/a.png", Body::empty()).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await["code"], "NoSuchKey");

    let dropped = send(&app, Method::DELETE, "/photos", Body::empty()).await;
    assert_eq!(dropped.status(), StatusCode::NO_CONTENT);

    let gone = send(&app, Method::GET, "/photos/b.png", Body::empty()).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(gone).await["code"], "NoSuchBucket");

    let list = send(&app, Method::GET, "/photos", Body::empty()).await;
    assert_eq!(list.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_object_under_other_bucket_is_denied() {
    let app = app();
    send(&app, Method::PUT, "/owner", Body::empty()).await;
    send(&app, Method::PUT, "/other", Body::empty()).await;
    send(&app, Method::PUT, "/owner/secret.txt", "private").await;

    let response = send(&app, Method::GET, "/other/secret.txt", Body::empty()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_text(response).await;
    assert!(!body.contains("private"));
}

#[tokio::test]
async fn test_emulation_headers_on_every_response() {
    let app = app();
    let ok = send(&app, Method::PUT, "/photos", Body::empty()).await;
    let err = send(&app, Method::GET, "/missing", Body::empty()).await;

    for response in [&ok, &err] {
        assert_eq!(header_str(response, "x-amz-request-id").len(), 32);
        assert!(response.headers().contains_key("x-amz-id-2"));
        assert!(header_str(response, "date").ends_with(" GMT"));
        assert!(header_str(response, "server").starts_with("bucket-emulator/"));
    }
    assert_ne!(
        header_str(&ok, "x-amz-request-id"),
        header_str(&err, "x-amz-request-id")
    );
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app();

    let live = send(&app, Method::GET, "/_healthz", Body::empty()).await;
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(body_json(live).await["status"], "ok");

    let ready = send(&app, Method::GET, "/_readyz", Body::empty()).await;
    assert_eq!(ready.status(), StatusCode::OK);
    assert_eq!(body_json(ready).await["checks"]["storage"]["ok"], true);
}

#[tokio::test]
async fn test_probe_names_are_ordinary_buckets() {
    let app = app();

    for name in ["healthz", "readyz"] {
        let created = send(&app, Method::PUT, &format!("/{name}"), Body::empty()).await;
        assert_eq!(created.status(), StatusCode::OK, "{name}");

        let put = send(&app, Method::PUT, &format!("/{name}/probe.txt"), "up").await;
        assert_eq!(put.status(), StatusCode::OK, "{name}");

        let list = send(&app, Method::GET, &format!("/{name}"), Body::empty()).await;
        assert_eq!(list.status(), StatusCode::OK, "{name}");
        let xml = body_text(list).await;
        assert!(xml.contains(&format!("<Name>{name}</Name>")), "{name}: {xml}");
        assert!(xml.contains("<Key>probe.txt</Key>"), "{name}: {xml}");
    }

    // probes stay reachable next to the buckets
    let ready = send(&app, Method::GET, "/_readyz", Body::empty()).await;
    assert_eq!(body_json(ready).await["status"], "ok");

    let reserved = send(&app, Method::PUT, "/_healthz", Body::empty()).await;
    assert_eq!(reserved.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_photo_scenario_against_every_store() {
    for (backend, h) in common::all().await {
        let app = routes().with_state(h.service.clone());

        let created = send(&app, Method::PUT, "/photos", Body::empty()).await;
        assert_eq!(created.status(), StatusCode::OK, "{backend}");

        let put = send(&app, Method::PUT, "/photos/cat.png", PNG_BYTES).await;
        assert_eq!(put.status(), StatusCode::OK, "{backend}");

        let content = h.service.get_object("photos", "cat.png").await.unwrap();
        assert_eq!(&content.data[..], PNG_BYTES, "{backend}");
        assert_eq!(content.content_type, "image/png", "{backend}");
        assert_eq!(content.etag.len(), 32, "{backend}");
        assert!(content.etag.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(h.service.object_exists("photos", "cat.png").await.unwrap());

        let dropped = send(&app, Method::DELETE, "/photos", Body::empty()).await;
        assert_eq!(dropped.status(), StatusCode::NO_CONTENT, "{backend}");
        let err = h.service.get_object("photos", "cat.png").await.unwrap_err();
        assert!(matches!(err, StoreError::BucketNotFound(_)), "{backend}: {err}");
    }
}
