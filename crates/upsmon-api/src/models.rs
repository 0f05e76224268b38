use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use upsmon_device::{
    Device, DeviceMetadata, DeviceTypeDescriptor, ErrorQuery, ErrorRecord, HistoryQuery,
    Measurement, MeasurementStats, Overview, Severity, WarningQuery, WarningRecord,
};

/// 单次查询的最大条数
pub const MAX_LIMIT: u64 = 10_000;

/// 上报响应
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub device_id: String,
}

/// 健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// 毫秒时间戳
    pub timestamp: i64,
}

/// 设备类型列表
#[derive(Debug, Serialize)]
pub struct DeviceTypesResponse {
    pub success: bool,
    pub device_types: Vec<DeviceTypeDescriptor>,
}

/// 设备查询请求
#[derive(Debug, Default, Deserialize)]
pub struct ListDevicesQuery {
    #[serde(rename = "type")]
    pub device_type: Option<String>,
}

/// 设备及其最新测量
#[derive(Debug, Serialize)]
pub struct DeviceWithState {
    #[serde(flatten)]
    pub device: Device,
    pub current_state: Option<Measurement>,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub success: bool,
    pub count: usize,
    pub devices: Vec<DeviceWithState>,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub success: bool,
    pub device: Device,
}

/// 设备元数据更新请求
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub config: Option<serde_json::Value>,
}

impl From<UpdateDeviceRequest> for DeviceMetadata {
    fn from(req: UpdateDeviceRequest) -> Self {
        DeviceMetadata {
            name: req.name,
            location: req.location,
            model: req.model,
            firmware_version: req.firmware_version,
            config: req.config,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentStateResponse {
    pub success: bool,
    pub data: Measurement,
}

/// 历史查询参数
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: Option<u64>,
}

impl From<HistoryParams> for HistoryQuery {
    fn from(params: HistoryParams) -> Self {
        let defaults = HistoryQuery::default();
        HistoryQuery {
            from: params.from,
            to: params.to,
            limit: params.limit.unwrap_or(defaults.limit).min(MAX_LIMIT),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Measurement>,
}

/// 错误查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ErrorParams {
    pub severity: Option<Severity>,
    pub limit: Option<u64>,
}

impl From<ErrorParams> for ErrorQuery {
    fn from(params: ErrorParams) -> Self {
        let defaults = ErrorQuery::default();
        ErrorQuery {
            severity: params.severity,
            limit: params.limit.unwrap_or(defaults.limit).min(MAX_LIMIT),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorsResponse {
    pub success: bool,
    pub count: usize,
    pub errors: Vec<ErrorRecord>,
}

/// 告警查询参数
#[derive(Debug, Default, Deserialize)]
pub struct WarningParams {
    pub resolved: Option<bool>,
    pub limit: Option<u64>,
}

impl From<WarningParams> for WarningQuery {
    fn from(params: WarningParams) -> Self {
        let defaults = WarningQuery::default();
        WarningQuery {
            resolved: params.resolved,
            limit: params.limit.unwrap_or(defaults.limit).min(MAX_LIMIT),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WarningsResponse {
    pub success: bool,
    pub count: usize,
    pub warnings: Vec<WarningRecord>,
}

/// 测量统计参数，缺省为全部时间范围
#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeviceStatsResponse {
    pub success: bool,
    pub device_id: String,
    pub from: i64,
    pub to: i64,
    pub stats: MeasurementStats,
}

/// 全局统计
#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub success: bool,
    pub generated_at: DateTime<Utc>,
    pub stats: Overview,
}
