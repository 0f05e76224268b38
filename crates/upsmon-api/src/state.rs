use std::sync::Arc;
use upsmon_device::TelemetryManager;
use upsmon_middleware::{ApiKeyAuth, BearerAuth, RateLimiter};

/// API 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 遥测管理器
    pub manager: Arc<TelemetryManager>,

    /// 设备上报的 API Key
    pub api_key: Arc<ApiKeyAuth>,

    /// 查询接口的 Bearer Token（未配置时不校验）
    pub dashboard_auth: Arc<BearerAuth>,

    /// 上报接口限流，None 表示关闭
    pub rate_limiter: Option<RateLimiter>,

    /// 允许跨域访问的前端地址
    pub cors_origin: Option<String>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(manager: Arc<TelemetryManager>, api_key: impl Into<String>) -> Self {
        Self {
            manager,
            api_key: Arc::new(ApiKeyAuth::new(api_key)),
            dashboard_auth: Arc::new(BearerAuth::default()),
            rate_limiter: None,
            cors_origin: None,
        }
    }

    pub fn with_dashboard_token(mut self, token: Option<String>) -> Self {
        self.dashboard_auth = Arc::new(BearerAuth::new(token));
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }
}
