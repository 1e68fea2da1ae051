//! API surface tests: endpoint shapes, validation errors, and batch limits.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use site_grader::api;
use site_grader::config::Config;
use site_grader::harness::{RequestsBuilder, StaticRetriever};
use site_grader::retriever::Retrieve;
use site_grader::service::ScanService;
use site_grader::storage;
use sqlx::sqlite::SqlitePoolOptions;

async fn test_router() -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    storage::run_migrations(&pool).await.unwrap();

    let retriever = StaticRetriever::with_fn(|site| {
        Ok(RequestsBuilder::new(&site.site_key())
            .headers(&[
                ("strict-transport-security", "max-age=63072000"),
                ("content-security-policy", "default-src 'none'"),
                ("x-content-type-options", "nosniff"),
                ("x-frame-options", "DENY"),
                ("referrer-policy", "no-referrer"),
            ])
            .build())
    });

    let config = Config {
        cooldown: Duration::from_secs(60),
        base_url: Some("https://observatory.example.test".to_string()),
        ..Config::default()
    };
    let service = Arc::new(ScanService::new(
        retriever as Arc<dyn Retrieve>,
        Arc::new(pool),
        config,
    ));
    api::router(service)
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn scan_returns_a_summary_row_with_details_url() {
    let router = test_router().await;
    let (status, body) = send(&router, post("/api/v2/scan?host=example.test")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scan"]["site_key"], "example.test");
    assert_eq!(body["scan"]["grade"], "A+");
    assert_eq!(body["scan"]["tests_quantity"], 10);
    assert_eq!(
        body["details_url"],
        "https://observatory.example.test/api/v2/analyze?host=example.test"
    );
    // Summary responses never carry the tests map.
    assert!(body.get("full_details").is_none());
}

#[tokio::test]
async fn invalid_hosts_are_rejected_with_422() {
    let router = test_router().await;

    for host in ["not%20a%20host", "192.168.0.1", "example.test:99999"] {
        let (status, body) = send(&router, post(&format!("/api/v2/scan?host={host}"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{host}");
        assert!(body["error"].is_string(), "{host}");
        assert!(body["message"].is_string(), "{host}");
    }
}

#[tokio::test]
async fn scan_full_details_includes_the_tests_map() {
    let router = test_router().await;
    let (status, body) = send(&router, post("/api/v2/scanFullDetails?host=example.test")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scan"]["site_key"], "example.test");
    let tests = body["full_details"]["tests"].as_object().unwrap();
    assert_eq!(tests.len(), 10);
    assert_eq!(
        tests["strict-transport-security"]["result"],
        "hsts-implemented-max-age-at-least-six-months"
    );
    assert_eq!(tests["content-security-policy"]["pass"], true);
}

#[tokio::test]
async fn analyze_get_includes_history() {
    let router = test_router().await;

    let _ = send(&router, post("/api/v2/scan?host=example.test")).await;
    let (status, body) = send(&router, get("/api/v2/analyze?host=example.test")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scan"]["grade"], "A+");
    assert!(body["history"].as_array().unwrap().len() >= 1);
    assert!(body.get("full_details").is_none());
}

#[tokio::test]
async fn analyze_post_includes_history_and_details() {
    let router = test_router().await;
    let (status, body) = send(&router, post("/api/v2/analyze?host=example.test")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["full_details"]["tests"].is_object());
    assert!(body["history"].is_array());
}

#[tokio::test]
async fn batch_scans_each_distinct_url() {
    let router = test_router().await;
    let body = json!({ "urls": ["a.example.test", "A.EXAMPLE.test", "b.example.test"] });
    let request = Request::builder()
        .method("POST")
        .uri("/api/v2/scanBatchFullDetails")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_object().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results["a.example.test"]["success"], true);
    assert_eq!(results["b.example.test"]["scan"]["grade"], "A+");
}

#[tokio::test]
async fn batch_rejects_more_than_max_batch_size_urls() {
    let router = test_router().await;
    let urls: Vec<String> = (0..11).map(|i| format!("site{i}.example.test")).collect();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v2/scanBatchFullDetails")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "urls": urls }).to_string()))
        .unwrap();

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid-request");
}

#[tokio::test]
async fn batch_reports_per_entry_failures() {
    let router = test_router().await;
    let body = json!({ "urls": ["example.test", "..not valid.."] });
    let request = Request::builder()
        .method("POST")
        .uri("/api/v2/scanBatchFullDetails")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_object().unwrap();
    assert_eq!(results["example.test"]["success"], true);
    assert_eq!(results["..not valid.."]["success"], false);
    assert_eq!(results["..not valid.."]["error"], "invalid-hostname");
}

#[tokio::test]
async fn stats_aggregates_the_persisted_corpus() {
    let router = test_router().await;
    let _ = send(&router, post("/api/v2/scan?host=a.example.test")).await;
    let _ = send(&router, post("/api/v2/scan?host=b.example.test")).await;

    let (status, body) = send(&router, get("/api/v2/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_scans"], 2);
    assert_eq!(body["total_sites"], 2);
    assert_eq!(body["grade_distribution"][0]["grade"], "A+");
    assert_eq!(body["grade_distribution"][0]["count"], 2);
}
