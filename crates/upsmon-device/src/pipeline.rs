use crate::device_types::DeviceTypeRegistry;
use crate::handler::{DeviceHandler, FallbackHandler, UpsHandler};
use crate::model::{DeviceType, NormalizedError, NormalizedMeasurement};
use crate::payload::RawPayload;
use crate::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 分发结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Processed {
    Measurement {
        device_type: DeviceType,
        record: NormalizedMeasurement,
    },
    Error {
        device_type: DeviceType,
        record: NormalizedError,
    },
}

impl Processed {
    pub fn device_type(&self) -> &DeviceType {
        match self {
            Processed::Measurement { device_type, .. } | Processed::Error { device_type, .. } => {
                device_type
            }
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Processed::Measurement { record, .. } => &record.device_id,
            Processed::Error { record, .. } => &record.device_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Processed::Measurement { .. } => "measurement",
            Processed::Error { .. } => "error",
        }
    }
}

/// 设备数据分发管线
///
/// 类型识别 -> 选择处理器 -> validate/normalize（或 process_error）。
/// 无内部可变状态，可在多个请求间共享。
pub struct Pipeline {
    registry: Arc<DeviceTypeRegistry>,
    handlers: HashMap<DeviceType, Arc<dyn DeviceHandler>>,
    fallback: Arc<dyn DeviceHandler>,
}

impl Pipeline {
    /// 创建只有通用处理器的管线
    pub fn new(registry: Arc<DeviceTypeRegistry>) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
            fallback: Arc::new(FallbackHandler),
        }
    }

    /// 创建包含内置处理器的管线
    pub fn with_builtin_handlers(registry: Arc<DeviceTypeRegistry>) -> Self {
        let ups = registry
            .get(&DeviceType::Ups)
            .cloned()
            .map(UpsHandler::new)
            .unwrap_or_default();
        Self::new(registry).with_handler(Arc::new(ups))
    }

    /// 注册专用处理器
    pub fn with_handler(mut self, handler: Arc<dyn DeviceHandler>) -> Self {
        self.handlers.insert(handler.device_type(), handler);
        self
    }

    pub fn registry(&self) -> &DeviceTypeRegistry {
        &self.registry
    }

    /// 选择处理器，未注册的类型使用通用处理器
    pub fn handler_for(&self, device_type: &DeviceType) -> &dyn DeviceHandler {
        self.handlers
            .get(device_type)
            .map(|h| h.as_ref())
            .unwrap_or_else(|| self.fallback.as_ref())
    }

    /// 处理一条上报
    pub fn process(&self, payload: &RawPayload) -> Result<Processed> {
        let device_type = self.registry.detect(payload);
        let handler = self.handler_for(&device_type);

        if payload.is_error_report() {
            if let Some(reporter) = handler.error_reporter() {
                let record = reporter.process_error(payload)?;
                debug!(device_id = %record.device_id, device_type = %device_type, "Error report normalized");
                return Ok(Processed::Error {
                    device_type,
                    record,
                });
            }
        }

        let record = handler.process(payload)?;
        debug!(device_id = %record.device_id, device_type = %device_type, "Measurement normalized");
        Ok(Processed::Measurement {
            device_type,
            record,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::with_builtin_handlers(Arc::new(DeviceTypeRegistry::builtin()))
    }
}
