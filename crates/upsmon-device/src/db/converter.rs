use crate::model::{
    Device, DeviceType, ErrorRecord, Measurement, MeasurementStatus, NormalizedError,
    NormalizedMeasurement, Severity, WarningRecord,
};
use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use tracing::warn;

/// Device 模型与数据库实体的转换
impl From<Device> for super::device::ActiveModel {
    fn from(device: Device) -> Self {
        Self {
            device_id: Set(device.device_id),
            device_type: Set(device.device_type.as_str().to_string()),
            name: Set(device.name),
            location: Set(device.location),
            model: Set(device.model),
            firmware_version: Set(device.firmware_version),
            config: Set(device.config),
            last_seen: Set(device.last_seen),
            created_at: Set(device.created_at),
        }
    }
}

impl From<super::device::Model> for Device {
    fn from(model: super::device::Model) -> Self {
        Self {
            device_id: model.device_id,
            device_type: DeviceType::from_tag(&model.device_type),
            name: model.name,
            location: model.location,
            model: model.model,
            firmware_version: model.firmware_version,
            config: model.config,
            last_seen: model.last_seen,
            created_at: model.created_at,
        }
    }
}

/// 新测量记录（id 由数据库生成）
impl From<NormalizedMeasurement> for super::measurement::ActiveModel {
    fn from(record: NormalizedMeasurement) -> Self {
        Self {
            id: NotSet,
            device_id: Set(record.device_id),
            timestamp: Set(record.timestamp),
            status: Set(record.status.as_str().to_string()),
            data_valid: Set(record.data_valid),
            data: Set(record.data),
            created_at: Set(Utc::now()),
        }
    }
}

impl From<super::measurement::Model> for Measurement {
    fn from(model: super::measurement::Model) -> Self {
        let status = model.status.parse().unwrap_or_else(|_| {
            warn!(id = model.id, status = %model.status, "Unrecognized stored status");
            MeasurementStatus::Ok
        });
        Self {
            id: model.id,
            device_id: model.device_id,
            timestamp: model.timestamp,
            status,
            data_valid: model.data_valid,
            data: model.data,
            created_at: model.created_at,
        }
    }
}

impl From<NormalizedError> for super::error_report::ActiveModel {
    fn from(record: NormalizedError) -> Self {
        Self {
            id: NotSet,
            device_id: Set(record.device_id),
            timestamp: Set(record.timestamp),
            severity: Set(record.severity.as_str().to_string()),
            category: Set(record.category),
            message: Set(record.message),
            error_stats: Set(record.error_stats),
            sensor_data: Set(record.sensor_data),
            created_at: Set(Utc::now()),
        }
    }
}

impl From<super::error_report::Model> for ErrorRecord {
    fn from(model: super::error_report::Model) -> Self {
        let severity = model.severity.parse().unwrap_or_else(|_| {
            warn!(id = model.id, severity = %model.severity, "Unrecognized stored severity");
            Severity::Error
        });
        Self {
            id: model.id,
            device_id: model.device_id,
            timestamp: model.timestamp,
            severity,
            category: model.category,
            message: model.message,
            error_stats: model.error_stats,
            sensor_data: model.sensor_data,
            created_at: model.created_at,
        }
    }
}

impl From<super::warning::Model> for WarningRecord {
    fn from(model: super::warning::Model) -> Self {
        Self {
            id: model.id,
            device_id: model.device_id,
            timestamp: model.timestamp,
            message: model.message,
            resolved: model.resolved,
            created_at: model.created_at,
        }
    }
}

/// 新告警
pub(crate) fn new_warning(
    device_id: &str,
    timestamp: i64,
    message: String,
) -> super::warning::ActiveModel {
    super::warning::ActiveModel {
        id: NotSet,
        device_id: Set(device_id.to_string()),
        timestamp: Set(timestamp),
        message: Set(message),
        resolved: Set(false),
        created_at: Set(Utc::now()),
    }
}
