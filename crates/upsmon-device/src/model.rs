use crate::payload::RawPayload;
use crate::{DeviceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 设备类型标签
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceType {
    /// 不间断电源
    Ups,
    /// 无法识别的设备
    Unknown,
    /// 通过配置注册的其他类型
    Custom(String),
}

impl DeviceType {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Ups => "UPS",
            DeviceType::Unknown => "UNKNOWN",
            DeviceType::Custom(s) => s.as_str(),
        }
    }

    pub fn from_tag(s: &str) -> Self {
        match s {
            "UPS" => DeviceType::Ups,
            "UNKNOWN" => DeviceType::Unknown,
            _ => DeviceType::Custom(s.to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DeviceType::Unknown)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeviceType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeviceType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(DeviceType::from_tag(&tag))
    }
}

/// 测量状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementStatus {
    Ok,
    Warning,
    Error,
    Critical,
}

impl MeasurementStatus {
    pub const ALL: [MeasurementStatus; 4] = [
        MeasurementStatus::Ok,
        MeasurementStatus::Warning,
        MeasurementStatus::Error,
        MeasurementStatus::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementStatus::Ok => "ok",
            MeasurementStatus::Warning => "warning",
            MeasurementStatus::Error => "error",
            MeasurementStatus::Critical => "critical",
        }
    }
}

impl FromStr for MeasurementStatus {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ok" => Ok(MeasurementStatus::Ok),
            "warning" => Ok(MeasurementStatus::Warning),
            "error" => Ok(MeasurementStatus::Error),
            "critical" => Ok(MeasurementStatus::Critical),
            other => Err(DeviceError::validation(format!("Invalid status: {}", other))),
        }
    }
}

impl fmt::Display for MeasurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 错误严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            other => Err(DeviceError::format(format!("Invalid severity: {}", other))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规范化后的测量记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMeasurement {
    pub device_id: String,
    /// 设备端时间戳（毫秒）
    pub timestamp: i64,
    pub status: MeasurementStatus,
    pub data_valid: bool,
    /// 设备相关的嵌套数据，原样保存
    pub data: Value,
}

/// 规范化后的错误上报
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedError {
    pub device_id: String,
    pub timestamp: i64,
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub error_stats: Option<Value>,
    pub sensor_data: Option<Value>,
}

/// 设备信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// 设备 ID（由设备自行上报）
    pub device_id: String,

    /// 设备类型
    pub device_type: DeviceType,

    pub name: Option<String>,
    pub location: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub config: Option<Value>,

    /// 最后上报时间
    pub last_seen: DateTime<Utc>,

    /// 首次上报时间
    pub created_at: DateTime<Utc>,
}

/// 设备元数据（upsert 时只覆盖提供的字段）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub name: Option<String>,
    pub location: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub config: Option<Value>,
}

impl DeviceMetadata {
    /// 从上报数据中提取可选的元数据字段
    pub fn from_payload(payload: &RawPayload) -> Self {
        let text = |key: &str| {
            payload
                .str_field(key)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            name: text("name"),
            location: text("location"),
            model: text("model"),
            firmware_version: text("firmware_version"),
            config: payload.get("config").filter(|v| v.is_object()).cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.model.is_none()
            && self.firmware_version.is_none()
            && self.config.is_none()
    }

    /// 将提供的字段合并进已有设备
    pub fn apply_to(&self, device: &mut Device) {
        if let Some(name) = &self.name {
            device.name = Some(name.clone());
        }
        if let Some(location) = &self.location {
            device.location = Some(location.clone());
        }
        if let Some(model) = &self.model {
            device.model = Some(model.clone());
        }
        if let Some(firmware) = &self.firmware_version {
            device.firmware_version = Some(firmware.clone());
        }
        if let Some(config) = &self.config {
            device.config = Some(config.clone());
        }
    }
}

/// 已存储的测量记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    pub device_id: String,
    pub timestamp: i64,
    pub status: MeasurementStatus,
    pub data_valid: bool,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// 已存储的错误记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: i64,
    pub device_id: String,
    pub timestamp: i64,
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub error_stats: Option<Value>,
    pub sensor_data: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// 已存储的告警
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningRecord {
    pub id: i64,
    pub device_id: String,
    pub timestamp: i64,
    pub message: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// 历史数据查询条件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: u64,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            limit: 1000,
        }
    }
}

/// 错误查询条件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorQuery {
    pub severity: Option<Severity>,
    pub limit: u64,
}

impl Default for ErrorQuery {
    fn default() -> Self {
        Self {
            severity: None,
            limit: 100,
        }
    }
}

/// 告警查询条件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningQuery {
    pub resolved: Option<bool>,
    pub limit: u64,
}

impl Default for WarningQuery {
    fn default() -> Self {
        Self {
            resolved: None,
            limit: 100,
        }
    }
}
