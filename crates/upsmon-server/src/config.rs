use anyhow::{anyhow, bail, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use tracing::warn;
use upsmon_device::{DeviceType, DeviceTypeDescriptor, DeviceTypeRegistry, MeasurementStatus};

/// 出厂默认的设备 API Key，生产环境必须修改
pub const DEFAULT_API_KEY: &str = "change-this-api-key";

/// 环境变量前缀，例如 `UPSMON__SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "UPSMON";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    /// 额外注册的设备类型
    pub device_types: Vec<DeviceTypeConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// 设备上报使用的 `X-API-Key`
    pub device_api_key: String,
    /// 查询接口的 Bearer Token，不配置时查询接口不鉴权
    pub dashboard_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// 每个客户端 IP 在窗口内允许的上报次数
    pub max_requests: u64,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    /// 前端地址
    pub origin: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// 输出 JSON 格式日志
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen: String,
}

/// 配置文件中的设备类型
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceTypeConfig {
    pub tag: String,
    pub display_name: String,
    #[serde(default)]
    pub expected_fields: Vec<String>,
    #[serde(default)]
    pub required_any: Vec<String>,
    #[serde(default)]
    pub signature: Vec<String>,
    #[serde(default = "default_status_levels")]
    pub status_levels: Vec<MeasurementStatus>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

// 默认值函数
fn default_status_levels() -> Vec<MeasurementStatus> {
    MeasurementStatus::ALL.to_vec()
}

fn default_poll_interval_ms() -> u64 {
    30_000
}

// Default trait 实现
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/ups_monitor.db?mode=rwc".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            device_api_key: DEFAULT_API_KEY.to_string(),
            dashboard_token: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: Some("http://localhost:3001".to_string()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "0.0.0.0:9100".to_string(),
        }
    }
}

impl From<&DeviceTypeConfig> for DeviceTypeDescriptor {
    fn from(config: &DeviceTypeConfig) -> Self {
        DeviceTypeDescriptor {
            device_type: DeviceType::from_tag(&config.tag),
            display_name: config.display_name.clone(),
            expected_fields: config.expected_fields.clone(),
            required_any: config.required_any.clone(),
            signature: config.signature.clone(),
            status_levels: config.status_levels.clone(),
            poll_interval_ms: config.poll_interval_ms,
        }
    }
}

impl AppConfig {
    /// 加载配置：TOML 文件（可选）+ `UPSMON__*` 环境变量
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow!("Invalid config path: {}", path.display()))?;
            builder = builder.add_source(File::new(path, FileFormat::Toml).required(false));
        }

        let settings = builder
            .add_source(
                env.prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = settings.try_deserialize()?;
        Ok(app_config)
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must not be 0");
        }
        if self.api.device_api_key.trim().is_empty() {
            bail!("api.device_api_key must not be empty");
        }
        if self.rate_limit.enabled
            && (self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0)
        {
            bail!("rate_limit.max_requests and rate_limit.window_secs must be greater than 0");
        }
        if self.metrics.enabled {
            self.metrics_addr()?;
        }
        for device_type in &self.device_types {
            let tag = device_type.tag.trim();
            if tag.is_empty() || tag == DeviceType::Unknown.as_str() {
                bail!("device_types: invalid tag '{}'", device_type.tag);
            }
        }

        if self.api.device_api_key == DEFAULT_API_KEY {
            warn!("api.device_api_key is still the default value, change it before deployment");
        }
        Ok(())
    }

    pub fn metrics_addr(&self) -> Result<SocketAddr> {
        self.metrics
            .listen
            .parse()
            .map_err(|e| anyhow!("Invalid metrics.listen '{}': {}", self.metrics.listen, e))
    }

    /// 内置类型 + 配置文件中的类型
    pub fn device_type_registry(&self) -> DeviceTypeRegistry {
        let mut registry = DeviceTypeRegistry::builtin();
        for device_type in &self.device_types {
            registry.register(device_type.into());
        }
        registry
    }
}
