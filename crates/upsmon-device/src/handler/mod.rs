//! 按设备类型划分的数据处理器
//!
//! 每种设备类型提供 `validate` / `normalize`，能接收错误上报的类型
//! 额外通过 [`DeviceHandler::error_reporter`] 暴露 [`ErrorReporter`]。

mod fallback;
mod ups;

pub use fallback::FallbackHandler;
pub use ups::UpsHandler;

use crate::model::{DeviceType, MeasurementStatus, NormalizedError, NormalizedMeasurement, Severity};
use serde_json::Value;
use crate::payload::RawPayload;
use crate::{DeviceError, Result};

/// 设备数据处理器
pub trait DeviceHandler: Send + Sync {
    /// 处理器对应的设备类型
    fn device_type(&self) -> DeviceType;

    /// 校验原始数据
    fn validate(&self, payload: &RawPayload) -> Result<()>;

    /// 转换为统一的测量记录（调用前应先通过 `validate`）
    fn normalize(&self, payload: &RawPayload) -> Result<NormalizedMeasurement>;

    /// 错误上报能力，不支持时返回 None
    fn error_reporter(&self) -> Option<&dyn ErrorReporter> {
        None
    }

    /// validate + normalize
    fn process(&self, payload: &RawPayload) -> Result<NormalizedMeasurement> {
        self.validate(payload)?;
        self.normalize(payload)
    }
}

/// 错误上报处理能力
pub trait ErrorReporter: Send + Sync {
    fn process_error(&self, payload: &RawPayload) -> Result<NormalizedError>;
}

/// 所有设备共有的必填字段
pub(crate) struct Identity<'a> {
    pub device_id: &'a str,
    pub timestamp: i64,
}

/// 校验 `device_id` 和 `timestamp`
pub(crate) fn require_identity(payload: &RawPayload) -> Result<Identity<'_>> {
    let device_id = match payload.get("device_id") {
        None | Some(serde_json::Value::Null) => {
            return Err(DeviceError::validation("device_id is required"))
        }
        Some(_) => payload
            .device_id()
            .ok_or_else(|| DeviceError::validation("device_id must be a non-empty string"))?,
    };

    let timestamp = match payload.get("timestamp") {
        None | Some(serde_json::Value::Null) => {
            return Err(DeviceError::validation("timestamp is required"))
        }
        Some(_) => payload
            .timestamp()
            .filter(|ts| *ts > 0)
            .ok_or_else(|| DeviceError::validation("timestamp must be a positive number"))?,
    };

    Ok(Identity {
        device_id,
        timestamp,
    })
}

/// 解析 `status`，缺省为 ok；`allowed` 为 None 时接受全部状态
pub(crate) fn parse_status(
    payload: &RawPayload,
    allowed: Option<&[MeasurementStatus]>,
) -> Result<MeasurementStatus> {
    let raw = match payload.get("status") {
        None | Some(serde_json::Value::Null) => return Ok(MeasurementStatus::Ok),
        Some(serde_json::Value::String(s)) if s.is_empty() => return Ok(MeasurementStatus::Ok),
        Some(serde_json::Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(DeviceError::validation(format!("Invalid status: {}", other)))
        }
    };

    let status: MeasurementStatus = raw.parse()?;
    match allowed {
        Some(levels) if !levels.contains(&status) => {
            Err(DeviceError::validation(format!("Invalid status: {}", raw)))
        }
        _ => Ok(status),
    }
}

/// 基础规范化：原始数据整体作为 data 保存
pub(crate) fn base_normalize(
    payload: &RawPayload,
    allowed: Option<&[MeasurementStatus]>,
) -> Result<NormalizedMeasurement> {
    let identity = require_identity(payload)?;
    Ok(NormalizedMeasurement {
        device_id: identity.device_id.to_string(),
        timestamp: identity.timestamp,
        status: parse_status(payload, allowed)?,
        data_valid: payload.flag_not_false("data_valid"),
        data: payload.to_value(),
    })
}

/// 基础错误上报处理
///
/// 先检查 `device_id` / `timestamp`，再检查 `type: "error"` 标识。
/// severity 缺省为 error，category 缺省为 system。
pub(crate) fn base_process_error(payload: &RawPayload) -> Result<NormalizedError> {
    let identity = require_identity(payload)?;

    if !payload.is_error_report() {
        return Err(DeviceError::format("Invalid error data format"));
    }

    let text = |key: &str, default: &str| -> Result<String> {
        match payload.get(key) {
            None | Some(Value::Null) => Ok(default.to_string()),
            Some(Value::String(s)) if s.is_empty() => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(DeviceError::format(format!("{} must be a string", key))),
        }
    };

    let severity: Severity = text("severity", "error")?.parse()?;

    Ok(NormalizedError {
        device_id: identity.device_id.to_string(),
        timestamp: identity.timestamp,
        severity,
        category: text("category", "system")?,
        message: text("message", "Unknown error")?,
        error_stats: payload.present("error_stats").cloned(),
        sensor_data: payload.present("sensor_data").cloned(),
    })
}
