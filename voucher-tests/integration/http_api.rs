//! HTTP API driven through the router without a socket

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use voucher_core::allocator::InMemorySlotStore;
use voucher_core::config::VoucherConfig;
use voucher_sim::StrategyRegistry;
use voucher_web::{AppState, build_router};

fn app_with(config: &VoucherConfig) -> (Router, Arc<InMemorySlotStore>) {
    let store = Arc::new(InMemorySlotStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(StrategyRegistry::with_builtin()),
        config,
    );
    (build_router(state, &config.server.allowed_origins), store)
}

fn app() -> (Router, Arc<InMemorySlotStore>) {
    app_with(&VoucherConfig::for_testing())
}

fn post_simulate(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/simulate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_simulate_returns_timeline() {
    let (app, store) = app();
    let body = json!({
        "total_clients": 20,
        "total_vouchers": 5,
        "seed": 42,
        "policy": "hybrid"
    });

    let response = app.oneshot(post_simulate(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result = json_body(response).await;
    assert_eq!(result["simulation"]["policy"], "hybrid");
    assert_eq!(result["simulation"]["seed"], 42);
    assert_eq!(result["simulation"]["slots"], 5);

    let events = result["events"].as_array().unwrap();
    assert_eq!(
        events.len() as u64,
        result["simulation"]["total_requests"].as_u64().unwrap()
    );
    let allocated = events
        .iter()
        .filter(|event| event["action"] == "allocated")
        .count();
    assert_eq!(allocated, 5);

    assert_eq!(result["arrival_order"].as_array().unwrap().len(), 20);
    assert_eq!(store.counter_count(), 0);
}

#[tokio::test]
async fn test_simulate_same_seed_same_events() {
    let body = json!({
        "total_clients": 15,
        "total_vouchers": 4,
        "seed": 99,
        "policy": "lottery"
    })
    .to_string();

    let (first_app, _) = app();
    let (second_app, _) = app();
    let first = json_body(first_app.oneshot(post_simulate(body.clone())).await.unwrap()).await;
    let second = json_body(second_app.oneshot(post_simulate(body)).await.unwrap()).await;

    assert_ne!(first["simulation"]["id"], second["simulation"]["id"]);
    assert_eq!(first["arrival_order"], second["arrival_order"]);
    assert_eq!(first["events"], second["events"]);
}

#[tokio::test]
async fn test_malformed_body_is_invalid_request() {
    let (app, _) = app();
    let response = app
        .oneshot(post_simulate("{\"total_clients\": ".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_missing_content_type_is_invalid_request() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/simulate")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_failures_create_no_counter() {
    let cases = [
        json!({"total_clients": 0, "total_vouchers": 5, "policy": "fifo"}),
        json!({"total_clients": 5, "total_vouchers": -2, "policy": "fifo"}),
        json!({"total_clients": 5, "total_vouchers": 2, "policy": "round_robin"}),
    ];

    for body in cases {
        let (app, store) = app();
        let response = app.oneshot(post_simulate(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let error = json_body(response).await;
        assert_eq!(error["code"], "INVALID_REQUEST");
        assert!(error["message"].as_str().is_some_and(|m| !m.is_empty()));
        assert_eq!(store.counter_count(), 0);
    }
}

#[tokio::test]
async fn test_population_limit_from_config() {
    let mut config = VoucherConfig::for_testing();
    config.limits.max_clients = 10;
    let (app, _) = app_with(&config);

    let body = json!({"total_clients": 11, "total_vouchers": 1, "policy": "fifo"});
    let response = app.oneshot(post_simulate(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_policies_listing() {
    let (app, _) = app();
    let response = app.oneshot(get("/policies")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"policies": ["fifo", "hybrid", "lottery", "priority"]})
    );
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_rate_limit_rejects_burst_overflow() {
    let mut config = VoucherConfig::for_testing();
    config.rate_limit.enabled = true;
    config.rate_limit.burst = 2;
    config.rate_limit.requests_per_second = 1;
    let (app, _) = app_with(&config);

    for _ in 0..2 {
        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let error = json_body(response).await;
    assert_eq!(error["code"], "RATE_LIMITED");
    assert_eq!(error["message"], "Too many requests");
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let mut config = VoucherConfig::for_testing();
    config.server.allowed_origins = vec!["http://localhost:5173".to_string()];
    let (app, _) = app_with(&config);

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_cors_permissive_by_default() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://anywhere.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
