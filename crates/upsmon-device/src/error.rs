use thiserror::Error;

/// 设备数据处理错误类型
#[derive(Error, Debug)]
pub enum DeviceError {
    /// 必填字段缺失或字段值非法
    #[error("{0}")]
    Validation(String),

    /// 错误上报格式不正确
    #[error("{0}")]
    Format(String),

    /// 设备未找到
    #[error("Device not found: {0}")]
    NotFound(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 设备数据处理结果类型
pub type Result<T> = std::result::Result<T, DeviceError>;

impl DeviceError {
    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        DeviceError::Validation(msg.into())
    }

    /// 创建格式错误
    pub fn format(msg: impl Into<String>) -> Self {
        DeviceError::Format(msg.into())
    }

    /// 是否为客户端数据问题（而非存储故障）
    pub fn is_client_error(&self) -> bool {
        matches!(self, DeviceError::Validation(_) | DeviceError::Format(_))
    }
}
