use super::{
    base_normalize, base_process_error, parse_status, require_identity, DeviceHandler,
    ErrorReporter,
};
use crate::model::{DeviceType, NormalizedError, NormalizedMeasurement};
use crate::payload::RawPayload;
use crate::Result;

/// 通用处理器
///
/// 用于无法识别或没有专用处理器的设备：只检查基础字段，
/// 整个上报内容原样作为 data 保存。带 `type: "error"` 的上报按通用规则
/// 转换为错误记录。
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackHandler;

impl DeviceHandler for FallbackHandler {
    fn device_type(&self) -> DeviceType {
        DeviceType::Unknown
    }

    fn validate(&self, payload: &RawPayload) -> Result<()> {
        require_identity(payload)?;
        parse_status(payload, None)?;
        Ok(())
    }

    fn normalize(&self, payload: &RawPayload) -> Result<NormalizedMeasurement> {
        base_normalize(payload, None)
    }

    fn error_reporter(&self) -> Option<&dyn ErrorReporter> {
        Some(self)
    }
}

impl ErrorReporter for FallbackHandler {
    fn process_error(&self, payload: &RawPayload) -> Result<NormalizedError> {
        base_process_error(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MeasurementStatus, Severity};
    use serde_json::json;

    #[test]
    fn test_stores_payload_verbatim() {
        let raw = json!({
            "device_id": "sensor-9",
            "timestamp": 1700000000000u64,
            "humidity": {"value": 41.5}
        });
        let payload = RawPayload::from_value(raw.clone()).unwrap();

        let record = FallbackHandler.process(&payload).unwrap();
        assert_eq!(record.device_id, "sensor-9");
        assert_eq!(record.status, MeasurementStatus::Ok);
        assert!(record.data_valid);
        assert_eq!(record.data, raw);
    }

    #[test]
    fn test_reports_errors_with_defaults() {
        let payload = RawPayload::from_value(json!({
            "device_id": "sensor-9",
            "timestamp": 1700000000000u64,
            "type": "error",
            "message": "sensor disconnected"
        }))
        .unwrap();

        let record = FallbackHandler
            .error_reporter()
            .unwrap()
            .process_error(&payload)
            .unwrap();
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.category, "system");
        assert_eq!(record.message, "sensor disconnected");
    }

    #[test]
    fn test_data_valid_false_is_kept() {
        let payload = RawPayload::from_value(json!({
            "device_id": "sensor-9",
            "timestamp": 10,
            "data_valid": false
        }))
        .unwrap();
        assert!(!FallbackHandler.process(&payload).unwrap().data_valid);
    }

    #[test]
    fn test_requires_identity() {
        let payload = RawPayload::from_value(json!({"timestamp": 10})).unwrap();
        assert!(FallbackHandler.validate(&payload).is_err());
    }
}
