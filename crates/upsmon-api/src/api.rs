use crate::{handlers, models::HealthResponse, state::AppState};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use upsmon_middleware::{api_key_middleware, bearer_middleware, rate_limit_middleware};

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    // 设备上报：限流 -> API Key -> 处理
    let mut ingest = Router::new()
        .route("/api/data", post(handlers::ingest))
        .route_layer(middleware::from_fn_with_state(
            state.api_key.clone(),
            api_key_middleware,
        ));
    if let Some(limiter) = state.rate_limiter.clone() {
        ingest = ingest.route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    // 查询接口
    let dashboard = Router::new()
        .route("/api/device-types", get(handlers::list_device_types))
        .route("/api/devices", get(handlers::list_devices))
        .route(
            "/api/devices/:device_id",
            get(handlers::get_device).put(handlers::update_device),
        )
        .route("/api/devices/:device_id/current", get(handlers::get_current_state))
        .route("/api/devices/:device_id/history", get(handlers::get_history))
        .route("/api/devices/:device_id/errors", get(handlers::get_errors))
        .route("/api/devices/:device_id/warnings", get(handlers::get_warnings))
        .route("/api/devices/:device_id/stats", get(handlers::get_device_stats))
        .route("/api/stats", get(handlers::get_overview))
        .route_layer(middleware::from_fn_with_state(
            state.dashboard_auth.clone(),
            bearer_middleware,
        ));

    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        .merge(ingest)
        .merge(dashboard)
        // 添加中间件
        .layer(cors_layer(state.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 配置了前端地址时只允许该来源（携带凭据），否则放开
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static("x-api-key"),
            ]),
        Err(_) => {
            warn!(origin = %origin, "Invalid CORS origin, cross-origin requests disabled");
            CorsLayer::new()
        }
    }
}

/// 健康检查
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp_millis(),
    })
}
