use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use std::sync::Arc;
use tracing::warn;

use super::{ApiKeyAuth, AuthError, BearerAuth};

/// 设备 API Key 认证中间件
pub async fn api_key_middleware(
    State(auth): State<Arc<ApiKeyAuth>>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Err(e) = auth.verify(req.headers()) {
        warn!(path = %req.uri().path(), error = %e, "Device request rejected");
        counter!("upsmon_ingest_rejected_total", 1, "reason" => "auth");
        return Err(e);
    }
    Ok(next.run(req).await)
}

/// 查询接口 Bearer Token 中间件
pub async fn bearer_middleware(
    State(auth): State<Arc<BearerAuth>>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    auth.verify(req.headers()).map_err(|e| {
        warn!(path = %req.uri().path(), error = %e, "Dashboard request rejected");
        e
    })?;
    Ok(next.run(req).await)
}
