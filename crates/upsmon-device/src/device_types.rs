use crate::model::{DeviceType, MeasurementStatus};
use crate::payload::RawPayload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 设备类型描述
///
/// 启动时定义，运行期间只读。新增设备类型只需要注册一个描述
/// （以及可选的专用处理器），不需要修改分发和存储代码。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTypeDescriptor {
    pub device_type: DeviceType,
    pub display_name: String,
    /// 该类型通常上报的字段
    pub expected_fields: Vec<String>,
    /// 至少需要出现其中一个字段
    #[serde(default)]
    pub required_any: Vec<String>,
    /// 结构识别：全部出现时判定为该类型
    #[serde(default)]
    pub signature: Vec<String>,
    pub status_levels: Vec<MeasurementStatus>,
    pub poll_interval_ms: u64,
}

impl DeviceTypeDescriptor {
    /// 内置 UPS 描述
    pub fn ups() -> Self {
        Self {
            device_type: DeviceType::Ups,
            display_name: "UPS System".to_string(),
            expected_fields: strings(&["battery", "output", "temperature", "efficiency"]),
            required_any: strings(&["battery", "output"]),
            signature: strings(&["battery", "output"]),
            status_levels: MeasurementStatus::ALL.to_vec(),
            poll_interval_ms: 30_000,
        }
    }

    pub fn allows_status(&self, status: MeasurementStatus) -> bool {
        self.status_levels.contains(&status)
    }

    /// 结构特征是否匹配
    fn matches(&self, payload: &RawPayload) -> bool {
        !self.signature.is_empty()
            && self
                .signature
                .iter()
                .all(|field| payload.present(field).is_some())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 设备类型注册表
#[derive(Debug, Clone)]
pub struct DeviceTypeRegistry {
    descriptors: BTreeMap<String, DeviceTypeDescriptor>,
}

impl DeviceTypeRegistry {
    /// 空注册表（只能识别为 UNKNOWN）
    pub fn empty() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// 包含内置类型的注册表
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(DeviceTypeDescriptor::ups());
        registry
    }

    /// 注册设备类型，同名类型会被覆盖
    pub fn register(&mut self, descriptor: DeviceTypeDescriptor) {
        self.descriptors
            .insert(descriptor.device_type.as_str().to_string(), descriptor);
    }

    pub fn get(&self, device_type: &DeviceType) -> Option<&DeviceTypeDescriptor> {
        self.descriptors.get(device_type.as_str())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.descriptors.contains_key(tag)
    }

    pub fn list(&self) -> Vec<&DeviceTypeDescriptor> {
        self.descriptors.values().collect()
    }

    /// 识别设备类型
    ///
    /// 顺序：显式声明且已注册的 `device_type` > 结构特征匹配（按标签顺序）> UNKNOWN。
    pub fn detect(&self, payload: &RawPayload) -> DeviceType {
        if let Some(declared) = payload.device_type() {
            if let Some(descriptor) = self.descriptors.get(declared) {
                return descriptor.device_type.clone();
            }
        }

        self.descriptors
            .values()
            .find(|descriptor| descriptor.matches(payload))
            .map(|descriptor| descriptor.device_type.clone())
            .unwrap_or(DeviceType::Unknown)
    }
}

impl Default for DeviceTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
