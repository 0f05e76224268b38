use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use upsmon_device::DeviceError;
use upsmon_middleware::AuthError;

/// API 错误类型
#[derive(Debug, Error)]
pub enum ApiError {
    /// 资源未找到
    #[error("{0}")]
    NotFound(String),
    /// 上报数据校验失败
    #[error("{0}")]
    ValidationError(String),
    /// 请求格式错误
    #[error("{0}")]
    BadRequest(String),
    /// 未认证
    #[error("{0}")]
    Unauthorized(String),
    /// 认证信息错误
    #[error("{0}")]
    Forbidden(String),
    /// 请求过多
    #[error("Too many requests, please try again later")]
    TooManyRequests,
    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(String),
    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 存储层细节只写日志，不返回给客户端
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

// 从 upsmon_device::DeviceError 转换
impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Validation(msg) | DeviceError::Format(msg) => {
                ApiError::ValidationError(msg)
            }
            DeviceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DeviceError::Database(e) => ApiError::DatabaseError(e.to_string()),
            DeviceError::Serialization(e) => ApiError::InternalError(e.to_string()),
            DeviceError::Other(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidApiKey => ApiError::Forbidden(err.to_string()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

// 从 sea_orm::DbErr 转换
impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        ApiError::DatabaseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_mapping() {
        let validation: ApiError = DeviceError::validation("device_id is required").into();
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.to_string(), "device_id is required");

        let format: ApiError = DeviceError::format("Invalid error data format").into();
        assert_eq!(format.status_code(), StatusCode::BAD_REQUEST);

        let missing: ApiError = DeviceError::NotFound("ups-9".to_string()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let db: ApiError = DeviceError::Database(sea_orm::DbErr::Custom("locked".into())).into();
        assert_eq!(db.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            ApiError::from(AuthError::MissingApiKey).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidApiKey).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
