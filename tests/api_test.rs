//! Integration tests for API endpoints

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{scanner, MockSource};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use trend_scanner::config::Config;
use trend_scanner::services::ScanService;
use trend_scanner::{api, AppState};

fn app_with(extra: &[(&'static str, &'static str)]) -> (Router, Arc<MockSource>) {
    let mut vars: HashMap<&str, &str> = [
        ("API_KEY_ADMIN", "admin-key"),
        ("API_KEY_VIEW", "view-key"),
        ("RSI50_FILTER", "false"),
    ]
    .into_iter()
    .collect();
    vars.extend(extra.iter().copied());
    let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

    let source = Arc::new(MockSource::numbered(4));
    let scan_service = ScanService::new(Arc::new(scanner(source.clone())), Duration::from_secs(5));

    let router = api::router(AppState {
        config: Arc::new(config),
        scan_service,
    });
    (router, source)
}

async fn send(router: Router, uri: &str, key: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(key) = key {
        request = request.header("x-api-key", key);
    }

    let response = router
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(uri: &str, key: Option<&str>) -> (StatusCode, Value) {
    let (router, _) = app_with(&[]);
    send(router, uri, key).await
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let (status, body) = get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_missing_key_is_rejected() {
    let (status, body) = get("/api/top30", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Missing x-api-key");
}

#[tokio::test]
async fn test_unknown_key_is_rejected() {
    let (status, body) = get("/api/top30", Some("nope")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid API key");
}

#[tokio::test]
async fn test_view_key_gets_ranked_list() {
    let (status, body) = get("/api/top30", Some("view-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["role"], "view");
    assert!(body["data"].is_array());
    assert!(body["updated"].is_string());
}

#[tokio::test]
async fn test_admin_key_role() {
    let (status, body) = get("/api/top30", Some("admin-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn test_invalid_override_is_bad_request() {
    let (status, body) = get("/api/top30?top_n=0", Some("view-key")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);

    let (status, _) = get("/api/top30?band_pct=150", Some("view-key")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_valid_override_is_accepted() {
    let (status, body) = get("/api/top30?band_pct=0.5&top_n=5", Some("view-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().len() <= 5);
}

#[tokio::test]
async fn test_overrides_cannot_raise_fetch_caps() {
    let (router, source) = app_with(&[("CONCURRENCY", "1"), ("MAX_SYMBOLS", "2")]);

    let (status, _) = send(
        router,
        "/api/top30?concurrency=10000&max_symbols=100000",
        Some("view-key"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(source.price_calls(), 2);
    assert_eq!(source.max_in_flight(), 1);
}
