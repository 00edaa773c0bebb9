use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::app::App;
use crate::controller::OPERATOR_TOKEN_HEADER;
use crate::store::{MemoryCacheStore, MemoryJobLogStore};
use crate::tests::support::{test_config, ScriptedClient};

fn test_app() -> App {
    App::new(
        CancellationToken::new(),
        test_config(),
        Arc::new(ScriptedClient::new()),
        Arc::new(MemoryCacheStore::new()),
        Arc::new(MemoryJobLogStore::new()),
    )
    .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn healthz_responds_ok() {
    let app = test_app();
    let router = app.server().router();

    let (status, body) = send(&router, get("/adsync/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_reports_missing_key() {
    let app = test_app();
    let router = app.server().router();

    let uri = "/adsync/status?customer_id=123-456&entity_type=campaign&start_date=2026-01-01&end_date=2026-01-07";
    let (status, body) = send(&router, get(uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], false);
    assert_eq!(body["state"], "missing");
    assert_eq!(body["expected_coverage"], 7);
}

#[tokio::test]
async fn status_rejects_half_open_range() {
    let app = test_app();
    let router = app.server().router();

    let uri = "/adsync/status?customer_id=123-456&entity_type=campaign&start_date=2026-01-01";
    let (status, body) = send(&router, get(uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("together"));
}

#[tokio::test]
async fn refresh_enqueues_job() {
    let app = test_app();
    let router = app.server().router();

    let uri = "/adsync/refresh?customer_id=123-456&entity_type=campaign&start_date=2026-01-01&end_date=2026-01-07&priority=5";
    let (status, body) = send(&router, post(uri)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
    let job_id = body["job_id"].as_u64().unwrap();

    // Workers are not running in this setup; the job sits pending.
    let job = app.queue().job(job_id).unwrap();
    assert_eq!(job.customer_id, "123-456");
    assert_eq!(job.priority, 5);
    assert_eq!(app.queue().depth(), 1);
}

#[tokio::test]
async fn invalidate_requires_operator_token() {
    let app = test_app();
    let router = app.server().router();
    let uri = "/adsync/invalidate?customer_id=123-456&entity_type=campaign";

    let (status, body) = send(&router, post(uri)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("operator"));

    let authorized = Request::builder()
        .method("POST")
        .uri(uri)
        .header(OPERATOR_TOKEN_HEADER, "test-operator")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, authorized).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["affected"], 0);
}

#[tokio::test]
async fn invalidate_rejects_wrong_token() {
    let app = test_app();
    let router = app.server().router();

    let request = Request::builder()
        .method("POST")
        .uri("/adsync/invalidate?customer_id=123-456&entity_type=campaign")
        .header(OPERATOR_TOKEN_HEADER, "not-the-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn queue_pause_resume_via_api() {
    let app = test_app();
    let router = app.server().router();

    let pause = Request::builder()
        .method("POST")
        .uri("/adsync/queue")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"action":"pause"}"#))
        .unwrap();
    let (status, body) = send(&router, pause).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paused"], true);
    assert!(app.queue().is_paused());

    let resume = Request::builder()
        .method("POST")
        .uri("/adsync/queue")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"action":"resume"}"#))
        .unwrap();
    let (status, body) = send(&router, resume).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paused"], false);
    assert!(!app.queue().is_paused());
}

#[tokio::test]
async fn queue_drain_is_operator_gated() {
    let app = test_app();
    let router = app.server().router();

    let enqueue_uri = "/adsync/refresh?customer_id=123-456&entity_type=campaign";
    let (status, _) = send(&router, post(enqueue_uri)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(app.queue().depth(), 1);

    let unauthorized = Request::builder()
        .method("POST")
        .uri("/adsync/queue")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"action":"drain"}"#))
        .unwrap();
    let (status, _) = send(&router, unauthorized).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.queue().depth(), 1);

    let authorized = Request::builder()
        .method("POST")
        .uri("/adsync/queue")
        .header("content-type", "application/json")
        .header(OPERATOR_TOKEN_HEADER, "test-operator")
        .body(Body::from(r#"{"action":"drain"}"#))
        .unwrap();
    let (status, body) = send(&router, authorized).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dropped"], 1);
    assert_eq!(app.queue().depth(), 0);
}

#[tokio::test]
async fn queue_stats_and_history_endpoints() {
    let app = test_app();
    let router = app.server().router();

    let (status, body) = send(&router, get("/adsync/queue")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["depth"], 0);
    assert_eq!(body["paused"], false);

    let (status, body) = send(&router, get("/adsync/queue/jobs?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn overview_exposes_counters_registry_and_queue() {
    let app = test_app();
    let router = app.server().router();

    let (status, body) = send(&router, get("/adsync/overview")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"]["hits"], 0);
    assert_eq!(body["queue"]["depth"], 0);
    assert!(body["registry"]["locks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn prometheus_endpoint_unavailable_without_exporter() {
    let app = test_app();
    let router = app.server().router();

    // Plain-text body, so skip the JSON helper.
    let response = router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
