pub mod config;
pub mod logging;
pub mod metrics;
pub mod shutdown;

use anyhow::{Context, Result};
use axum::Router;
use crate::config::AppConfig;
use sea_orm::Database;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use upsmon_api::{create_router, AppState};
use upsmon_device::{setup_schema, TelemetryManager};
use upsmon_middleware::{RateLimitStrategy, RateLimiter};

/// 限流桶的清理周期
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// 为 SQLite 文件数据库创建所在目录
pub fn ensure_sqlite_dir(url: &str) -> Result<()> {
    let Some(rest) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };

    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// 连接数据库并组装路由
pub async fn build_app(config: &AppConfig) -> Result<Router> {
    ensure_sqlite_dir(&config.database.url)?;
    let db = Database::connect(&config.database.url)
        .await
        .with_context(|| format!("Failed to connect to database {}", config.database.url))?;
    setup_schema(&db).await?;

    let registry = config.device_type_registry();
    let tags: Vec<&str> = registry
        .list()
        .iter()
        .map(|d| d.device_type.as_str())
        .collect();
    info!(device_types = ?tags, "Device type registry loaded");
    let manager = Arc::new(TelemetryManager::with_registry(Arc::new(db), registry));

    let mut state = AppState::new(manager, config.api.device_api_key.clone())
        .with_dashboard_token(config.api.dashboard_token.clone());

    if let Some(origin) = config.cors.origin.as_deref().filter(|o| !o.is_empty()) {
        state = state.with_cors_origin(origin);
    }

    if config.rate_limit.enabled {
        let window = Duration::from_secs(config.rate_limit.window_secs);
        let limiter = RateLimiter::new(vec![RateLimitStrategy::by_ip(
            config.rate_limit.max_requests,
            window,
        )]);
        // 空闲超过一个窗口的桶已经回满，可以直接丢弃
        limiter.spawn_cleanup(RATE_LIMIT_CLEANUP_INTERVAL, window);
        info!(
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window_secs,
            "Ingest rate limiting enabled"
        );
        state = state.with_rate_limiter(limiter);
    }

    Ok(create_router(state))
}

/// 启动 HTTP 服务，`shutdown` 完成后优雅退出
pub async fn run<F>(config: AppConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if config.metrics.enabled {
        metrics::init_metrics(config.metrics_addr()?)?;
    }

    let app = build_app(&config).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 UPS monitor server listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("Server stopped");
    Ok(())
}
