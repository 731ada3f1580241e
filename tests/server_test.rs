//! HTTP route tests for /api/rag

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use common::{
    pipeline, pipeline_with_config, DownGenerator, FailingStore, HashingEmbedder,
    RecordingGenerator, DIM,
};
use concierge::rag::RagConfig;
use concierge::server;
use concierge::store::{MemoryPassageStore, PassageStore};

const BOUNDARY: &str = "concierge-test-boundary";
const MAX_UPLOAD: usize = 10 * 1024 * 1024;

fn app_with(store: Arc<dyn PassageStore>, max_upload: usize) -> Router {
    let pipeline = pipeline(
        Arc::new(HashingEmbedder::new()),
        Arc::new(RecordingGenerator::replying("Breakfast is served from 7 to 10 AM.")),
        store,
    );
    server::router(Arc::new(pipeline), max_upload)
}

fn app() -> Router {
    app_with(Arc::new(MemoryPassageStore::new(DIM)), MAX_UPLOAD)
}

fn multipart_request(field: &str, file_name: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\
         \r\n\
         {content}\r\n\
         --{b}--\r\n",
        b = BOUNDARY,
    );
    Request::builder()
        .method("POST")
        .uri("/api/rag/ingest")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn ask_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/rag/ask")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/rag/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "RAG service is running");
}

#[tokio::test]
async fn test_ingest_upload() {
    let response = app()
        .oneshot(multipart_request(
            "pdf",
            "house-rules.txt",
            "Check-in begins at 3 PM daily.●Check-out is by 11 AM sharp.●Breakfast runs 7 to 10 AM.",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "PDF ingested successfully");
    assert_eq!(body["file"], "house-rules.txt");
    assert_eq!(body["passages_stored"], 3);
}

#[tokio::test]
async fn test_ingest_upload_with_concurrent_storage() {
    let store = Arc::new(MemoryPassageStore::new(DIM));
    let pipeline = pipeline_with_config(
        Arc::new(HashingEmbedder::new()),
        Arc::new(RecordingGenerator::replying("unused")),
        store.clone(),
        RagConfig {
            concurrency: 4,
            ..Default::default()
        },
    );
    let app = server::router(Arc::new(pipeline), MAX_UPLOAD);

    let response = app
        .oneshot(multipart_request(
            "pdf",
            "amenities.txt",
            "The rooftop pool opens at 7 AM.●The gym never closes its doors.●\
             Valet parking waits at the main entrance.●Pets under 20 kg are welcome.●\
             Late checkout is free for members.",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["passages_stored"], 5);
    assert_eq!(store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_ingest_without_pdf_field() {
    let response = app()
        .oneshot(multipart_request("document", "rules.txt", "Pool opens at seven in the morning."))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "input_error");
    assert_eq!(body["message"], "No file uploaded");
}

#[tokio::test]
async fn test_ingest_unsupported_type() {
    let response = app()
        .oneshot(multipart_request("pdf", "rules.docx", "binary content here"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "extraction_error");
}

#[tokio::test]
async fn test_ingest_oversized_upload() {
    let app = app_with(Arc::new(MemoryPassageStore::new(DIM)), 64);
    let content = "Late checkout can be arranged with the front desk. ".repeat(10);

    let response = app
        .oneshot(multipart_request("pdf", "rules.txt", &content))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ingest_store_failure() {
    let app = app_with(Arc::new(FailingStore::failing_at(0)), MAX_UPLOAD);

    let response = app
        .oneshot(multipart_request(
            "pdf",
            "rules.txt",
            "Pets are welcome in ground floor rooms.●Parking costs 20 dollars per night.",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "persistence_error");
}

#[tokio::test]
async fn test_ask() {
    let response = app()
        .oneshot(ask_request(r#"{"question": "When is breakfast?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["type"], "concierge_response");
    assert_eq!(body["answer"], "Breakfast is served from 7 to 10 AM.");
}

#[tokio::test]
async fn test_ask_invalid_body() {
    let response = app().oneshot(ask_request("not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "input_error");
    assert_eq!(body["message"], "Invalid request body");
}

#[tokio::test]
async fn test_ask_missing_question() {
    let response = app().oneshot(ask_request(r#"{"question": ""}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app().oneshot(ask_request("{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ask_generation_failure() {
    let pipeline = pipeline(
        Arc::new(HashingEmbedder::new()),
        Arc::new(DownGenerator),
        Arc::new(MemoryPassageStore::new(DIM)),
    );
    let app = server::router(Arc::new(pipeline), MAX_UPLOAD);

    let response = app
        .oneshot(ask_request(r#"{"question": "Is there a gym?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "generation_error");
}
