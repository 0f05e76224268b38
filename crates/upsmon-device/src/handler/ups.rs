use super::{base_process_error, parse_status, require_identity, DeviceHandler, ErrorReporter};
use crate::device_types::DeviceTypeDescriptor;
use crate::model::{DeviceType, NormalizedError, NormalizedMeasurement};
use crate::payload::RawPayload;
use crate::{DeviceError, Result};
use serde_json::{json, Value};

/// UPS 数据处理器
#[derive(Debug, Clone)]
pub struct UpsHandler {
    descriptor: DeviceTypeDescriptor,
}

impl UpsHandler {
    pub fn new(descriptor: DeviceTypeDescriptor) -> Self {
        Self { descriptor }
    }

    /// 兼容旧固件的单一温度值
    ///
    /// 优先使用旧版 `temperature`，其次 `temperature_battery.value`，
    /// 再次 `temperature_board.value`，都没有时为 null。
    fn merged_temperature(payload: &RawPayload) -> Value {
        let sensor_value = |key: &str| {
            payload
                .defined(key)
                .and_then(|sensor| sensor.get("value"))
                .filter(|v| !v.is_null())
                .cloned()
        };

        payload
            .defined("temperature")
            .cloned()
            .or_else(|| sensor_value("temperature_battery"))
            .or_else(|| sensor_value("temperature_board"))
            .unwrap_or(Value::Null)
    }

    fn present_or_null(payload: &RawPayload, key: &str) -> Value {
        payload.present(key).cloned().unwrap_or(Value::Null)
    }
}

impl Default for UpsHandler {
    fn default() -> Self {
        Self::new(DeviceTypeDescriptor::ups())
    }
}

impl DeviceHandler for UpsHandler {
    fn device_type(&self) -> DeviceType {
        self.descriptor.device_type.clone()
    }

    fn validate(&self, payload: &RawPayload) -> Result<()> {
        require_identity(payload)?;

        let required = &self.descriptor.required_any;
        if !required.is_empty() && required.iter().all(|f| payload.present(f).is_none()) {
            return Err(DeviceError::validation(format!(
                "{} data must contain {} fields",
                self.descriptor.device_type,
                required.join(" or ")
            )));
        }

        parse_status(payload, Some(&self.descriptor.status_levels))?;
        Ok(())
    }

    fn normalize(&self, payload: &RawPayload) -> Result<NormalizedMeasurement> {
        let identity = require_identity(payload)?;
        let status = parse_status(payload, Some(&self.descriptor.status_levels))?;

        let field = |key: &str| Self::present_or_null(payload, key);
        let data = json!({
            "battery": field("battery"),
            "output": field("output"),
            "temperature_battery": field("temperature_battery"),
            "temperature_board": field("temperature_board"),
            "temperature": Self::merged_temperature(payload),
            "temperature_valid": payload.flag_not_false("temperature_valid"),
            "efficiency": field("efficiency"),
            "energy_consumed": field("energy_consumed"),
            "energy_supplied": field("energy_supplied"),
            "capacity": field("capacity"),
            "errors": field("errors"),
            "warnings": field("warnings"),
        });

        Ok(NormalizedMeasurement {
            device_id: identity.device_id.to_string(),
            timestamp: identity.timestamp,
            status,
            data_valid: payload.flag_not_false("data_valid"),
            data,
        })
    }

    fn error_reporter(&self) -> Option<&dyn ErrorReporter> {
        Some(self)
    }
}

impl ErrorReporter for UpsHandler {
    fn process_error(&self, payload: &RawPayload) -> Result<NormalizedError> {
        base_process_error(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MeasurementStatus, Severity};

    fn payload(value: Value) -> RawPayload {
        RawPayload::from_value(value).unwrap()
    }

    #[test]
    fn test_requires_battery_or_output() {
        let handler = UpsHandler::default();
        let err = handler
            .validate(&payload(json!({"device_id": "ups-1", "timestamp": 1})))
            .unwrap_err();
        assert!(matches!(err, DeviceError::Validation(_)));
        assert_eq!(err.to_string(), "UPS data must contain battery or output fields");

        assert!(handler
            .validate(&payload(json!({"device_id": "ups-1", "timestamp": 1, "output": {"load": 20}})))
            .is_ok());
    }

    #[test]
    fn test_rejects_invalid_status() {
        let handler = UpsHandler::default();
        let err = handler
            .validate(&payload(json!({
                "device_id": "ups-1", "timestamp": 1,
                "battery": {"level": 80}, "status": "melting"
            })))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid status: melting");
    }

    #[test]
    fn test_legacy_temperature() {
        let record = UpsHandler::default()
            .process(&payload(json!({
                "device_id": "ups-1", "timestamp": 1700000000000u64,
                "battery": {"voltage": 13.2}, "temperature": 22.5
            })))
            .unwrap();

        assert_eq!(record.data["temperature"], json!(22.5));
        assert_eq!(record.data["temperature_battery"], Value::Null);
        assert_eq!(record.status, MeasurementStatus::Ok);
        assert!(record.data_valid);
    }

    #[test]
    fn test_structured_temperature() {
        let record = UpsHandler::default()
            .process(&payload(json!({
                "device_id": "ups-1", "timestamp": 1700000000000u64,
                "battery": {"voltage": 13.2},
                "temperature_battery": {"value": 30.1, "sensor": "ntc"},
                "temperature_board": {"value": 41.0}
            })))
            .unwrap();

        assert_eq!(record.data["temperature"], json!(30.1));
        assert_eq!(record.data["temperature_battery"]["value"], json!(30.1));
        assert_eq!(record.data["temperature_battery"]["sensor"], json!("ntc"));
        assert_eq!(record.data["temperature_board"]["value"], json!(41.0));
    }

    #[test]
    fn test_board_temperature_and_missing_temperature() {
        let handler = UpsHandler::default();
        let board = handler
            .process(&payload(json!({
                "device_id": "ups-1", "timestamp": 5,
                "output": {"power": 100},
                "temperature_board": {"value": 35.5}
            })))
            .unwrap();
        assert_eq!(board.data["temperature"], json!(35.5));

        let none = handler
            .process(&payload(json!({"device_id": "ups-1", "timestamp": 5, "output": {"power": 100}})))
            .unwrap();
        assert_eq!(none.data["temperature"], Value::Null);
    }

    #[test]
    fn test_legacy_zero_temperature_is_kept() {
        let record = UpsHandler::default()
            .process(&payload(json!({
                "device_id": "ups-1", "timestamp": 5,
                "battery": {"level": 50},
                "temperature": 0,
                "temperature_battery": {"value": 30.1}
            })))
            .unwrap();
        assert_eq!(record.data["temperature"], json!(0));
    }

    #[test]
    fn test_validity_flags() {
        let record = UpsHandler::default()
            .process(&payload(json!({
                "device_id": "ups-1", "timestamp": 5,
                "battery": {"level": 50},
                "data_valid": false,
                "temperature_valid": "yes",
                "status": "warning"
            })))
            .unwrap();
        assert!(!record.data_valid);
        assert_eq!(record.data["temperature_valid"], json!(true));
        assert_eq!(record.status, MeasurementStatus::Warning);
    }

    #[test]
    fn test_process_error_defaults() {
        let handler = UpsHandler::default();
        let reporter = handler.error_reporter().unwrap();
        let record = reporter
            .process_error(&payload(json!({
                "device_id": "d1", "timestamp": 1700000000000u64, "type": "error"
            })))
            .unwrap();

        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.category, "system");
        assert_eq!(record.message, "Unknown error");
        assert!(record.error_stats.is_none());
    }

    #[test]
    fn test_process_error_fields() {
        let record = UpsHandler::default()
            .process_error(&payload(json!({
                "device_id": "d1", "timestamp": 1700000000000u64, "type": "error",
                "severity": "critical", "category": "battery", "message": "overheat",
                "sensor_data": {"temperature": 71.0}
            })))
            .unwrap();

        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.category, "battery");
        assert_eq!(record.message, "overheat");
        assert_eq!(record.sensor_data, Some(json!({"temperature": 71.0})));
    }

    #[test]
    fn test_process_error_requires_marker() {
        let handler = UpsHandler::default();
        let missing = handler.process_error(&payload(json!({"device_id": "d1", "timestamp": 1})));
        assert!(matches!(missing, Err(DeviceError::Format(_))));

        let wrong = handler
            .process_error(&payload(json!({"device_id": "d1", "timestamp": 1, "type": "status"})));
        assert!(matches!(wrong, Err(DeviceError::Format(_))));

        let bad_severity = handler.process_error(&payload(json!({
            "device_id": "d1", "timestamp": 1, "type": "error", "severity": "apocalyptic"
        })));
        assert!(matches!(bad_severity, Err(DeviceError::Format(_))));
    }
}
