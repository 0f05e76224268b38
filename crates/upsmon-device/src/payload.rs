use crate::{DeviceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 设备上报的原始数据
///
/// 不同固件版本的字段结构差异较大，这里只保留 JSON 对象，
/// 通过显式的可选字段访问器读取，不做强类型约束。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Map<String, Value>);

impl RawPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// 从任意 JSON 值构建，非对象时返回验证错误
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            _ => Err(DeviceError::validation("payload must be a JSON object")),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// 字段存在且不为空值（缺失、null、false、0、"" 都视为不存在）
    pub fn present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| is_present(v))
    }

    /// 字段存在且不为 null（数值 0 也算有效读数）
    pub fn defined(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn device_id(&self) -> Option<&str> {
        self.str_field("device_id").filter(|s| !s.is_empty())
    }

    /// 时间戳（毫秒），小数部分截断
    pub fn timestamp(&self) -> Option<i64> {
        let value = self.0.get("timestamp")?;
        if let Some(ts) = value.as_i64() {
            return Some(ts);
        }
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f < i64::MAX as f64)
            .map(|f| f as i64)
    }

    /// 显式声明的设备类型
    pub fn device_type(&self) -> Option<&str> {
        self.str_field("device_type")
    }

    pub fn status(&self) -> Option<&str> {
        self.str_field("status")
    }

    /// 是否带有错误上报标识 `type: "error"`
    pub fn is_error_report(&self) -> bool {
        self.str_field("type") == Some("error")
    }

    /// `field !== false` 语义：只有字面量 false 才视为无效
    pub fn flag_not_false(&self, key: &str) -> bool {
        !matches!(self.0.get(key), Some(Value::Bool(false)))
    }

    /// 告警列表，非字符串条目保留其 JSON 文本
    pub fn warnings(&self) -> Vec<String> {
        match self.0.get("warnings") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for RawPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// 固件使用的宽松真值判断
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
