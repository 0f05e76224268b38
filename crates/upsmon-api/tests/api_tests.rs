use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use sea_orm::Database;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use upsmon_api::{create_router, AppState};
use upsmon_device::{setup_schema, DeviceTypeRegistry, TelemetryManager};
use upsmon_middleware::{RateLimitStrategy, RateLimiter};

const API_KEY: &str = "test-device-key";

async fn create_state() -> AppState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    setup_schema(&db).await.unwrap();
    let manager = TelemetryManager::with_registry(Arc::new(db), DeviceTypeRegistry::builtin());
    AppState::new(Arc::new(manager), API_KEY)
}

async fn create_app() -> Router {
    create_router(create_state().await)
}

fn post_data(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/data")
        .header("Content-Type", "application/json")
        .header("X-API-Key", API_KEY)
        .header("X-Forwarded-For", "192.0.2.10")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn ups_sample(device_id: &str, timestamp: i64) -> Value {
    json!({
        "device_id": device_id,
        "timestamp": timestamp,
        "battery": {"voltage": 13.4, "level": 98},
        "output": {"voltage": 230, "load": 31},
        "temperature_battery": {"value": 24.5},
        "efficiency": 93.0,
        "warnings": ["Battery replacement due"]
    })
}

#[tokio::test]
async fn test_health() {
    let app = create_app().await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_ingest_then_current_state() {
    let app = create_app().await;

    let response = app
        .clone()
        .oneshot(post_data(ups_sample("ups-01", 1_700_000_000_000)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"success": true, "message": "Data received", "device_id": "ups-01"})
    );

    let response = app
        .clone()
        .oneshot(get("/api/devices/ups-01/current"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["data"]["temperature"], json!(24.5));
    assert_eq!(body["data"]["data"]["battery"]["level"], json!(98));

    let response = app
        .clone()
        .oneshot(get("/api/devices/ups-01/warnings"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["warnings"][0]["message"], "Battery replacement due");

    let response = app.oneshot(get("/api/devices?type=UPS")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["devices"][0]["device_id"], "ups-01");
    assert_eq!(body["devices"][0]["device_type"], "UPS");
    assert_eq!(body["devices"][0]["current_state"]["timestamp"], 1_700_000_000_000i64);
}

#[tokio::test]
async fn test_invalid_payload_leaves_state_unchanged() {
    let app = create_app().await;
    app.clone()
        .oneshot(post_data(ups_sample("ups-01", 1000)))
        .await
        .unwrap();

    // 缺少 device_id
    let response = app
        .clone()
        .oneshot(post_data(json!({"timestamp": 2000, "battery": {}, "output": {}})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "device_id is required");

    // 声明为 UPS 但没有 battery/output
    let response = app
        .clone()
        .oneshot(post_data(json!({
            "device_id": "ups-01", "timestamp": 3000, "device_type": "UPS"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "UPS data must contain battery or output fields");

    let response = app
        .oneshot(get("/api/devices/ups-01/history"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["timestamp"], 1000);
}

#[tokio::test]
async fn test_missing_timestamp_rejected() {
    let app = create_app().await;
    app.clone()
        .oneshot(post_data(ups_sample("ups-01", 1000)))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(get("/api/devices/ups-01"))
        .await
        .unwrap();
    let before = body_json(response).await["device"]["last_seen"].clone();

    let mut bad = ups_sample("ups-01", 2000);
    bad.as_object_mut().unwrap().remove("timestamp");
    let response = app.clone().oneshot(post_data(bad)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "timestamp is required");

    let response = app
        .clone()
        .oneshot(get("/api/devices/ups-01/current"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["timestamp"], 1000);

    let response = app.oneshot(get("/api/devices/ups-01")).await.unwrap();
    let after = body_json(response).await["device"]["last_seen"].clone();
    assert!(!before.is_null());
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_untyped_error_report() {
    let app = create_app().await;

    let response = app
        .clone()
        .oneshot(post_data(json!({
            "device_id": "d1",
            "timestamp": 1_700_000_000_000i64,
            "type": "error",
            "severity": "critical",
            "category": "battery",
            "message": "overheat"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Error data received");

    let response = app
        .clone()
        .oneshot(get("/api/devices/d1/errors"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["errors"][0]["severity"], "critical");
    assert_eq!(body["errors"][0]["message"], "overheat");

    let response = app
        .oneshot(get("/api/devices/d1/current"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body() {
    let app = create_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/data")
        .header("Content-Type", "application/json")
        .header("X-API-Key", API_KEY)
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(post_data(json!([1, 2, 3]))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_key_required() {
    let app = create_app().await;

    let missing = Request::builder()
        .method("POST")
        .uri("/api/data")
        .header("Content-Type", "application/json")
        .body(Body::from(ups_sample("ups-01", 1).to_string()))
        .unwrap();
    let response = app.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing X-API-Key header");

    let wrong = Request::builder()
        .method("POST")
        .uri("/api/data")
        .header("Content-Type", "application/json")
        .header("X-API-Key", "guess")
        .body(Body::from(ups_sample("ups-01", 1).to_string()))
        .unwrap();
    let response = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid API key");

    // 被拒绝的请求不会创建设备
    let response = app.oneshot(get("/api/devices/ups-01")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_error_report() {
    let app = create_app().await;

    let response = app
        .clone()
        .oneshot(post_data(json!({
            "device_id": "ups-01",
            "timestamp": 1_700_000_000_000i64,
            "device_type": "UPS",
            "type": "error",
            "severity": "critical",
            "category": "battery",
            "message": "Battery temperature too high"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Error data received");

    let response = app
        .clone()
        .oneshot(get("/api/devices/ups-01/errors?severity=critical"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["errors"][0]["category"], "battery");

    // 错误上报不产生测量数据
    let response = app
        .clone()
        .oneshot(get("/api/devices/ups-01/current"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["stats"]["errors"]["critical"], 1);
    assert_eq!(body["stats"]["devices_detail"][0]["current_status"], "unknown");
}

#[tokio::test]
async fn test_unknown_device_and_device_types() {
    let app = create_app().await;
    let raw = json!({"device_id": "env-1", "timestamp": 10, "humidity": 44});

    let response = app.clone().oneshot(post_data(raw.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/devices/env-1")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["device"]["device_type"], "UNKNOWN");

    let response = app
        .clone()
        .oneshot(get("/api/devices/env-1/current"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["data"], raw);

    let response = app.oneshot(get("/api/device-types")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["device_types"][0]["device_type"], "UPS");
}

#[tokio::test]
async fn test_update_device_and_stats() {
    let app = create_app().await;
    for ts in [100, 200] {
        app.clone()
            .oneshot(post_data(ups_sample("ups-01", ts)))
            .await
            .unwrap();
    }

    let request = Request::builder()
        .method("PUT")
        .uri("/api/devices/ups-01")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"name": "Rack UPS", "location": "DC-1"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["device"]["name"], "Rack UPS");

    let request = Request::builder()
        .method("PUT")
        .uri("/api/devices/ghost")
        .header("Content-Type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get("/api/devices/ups-01/stats?from=0&to=150"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["stats"]["count"], 1);
    assert_eq!(body["stats"]["avg_battery_voltage"], json!(13.4));
    assert_eq!(body["stats"]["avg_efficiency"], json!(93.0));
}

#[tokio::test]
async fn test_dashboard_token() {
    let state = create_state()
        .await
        .with_dashboard_token(Some("dash-token".to_string()));
    let app = create_router(state);

    let response = app.clone().oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/stats")
        .header("Authorization", "Bearer dash-token")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 上报接口只看 API Key
    let response = app
        .oneshot(post_data(ups_sample("ups-01", 1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit() {
    let limiter = RateLimiter::new(vec![RateLimitStrategy::by_ip(
        3,
        Duration::from_secs(900),
    )]);
    let app = create_router(create_state().await.with_rate_limiter(limiter));

    for ts in 1..=3 {
        let response = app
            .clone()
            .oneshot(post_data(ups_sample("ups-01", ts)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_data(ups_sample("ups-01", 4)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // 查询接口不受上报限流影响
    let response = app
        .oneshot(get("/api/devices/ups-01/history"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 3);
}
