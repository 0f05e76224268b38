use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 设备上报使用的请求头
pub const API_KEY_HEADER: &str = "X-API-Key";

/// 认证失败原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing X-API-Key header")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid bearer token")]
    InvalidToken,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidApiKey => StatusCode::FORBIDDEN,
            AuthError::MissingApiKey | AuthError::MissingToken | AuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

/// 逐字节比较，耗时与首个不同字节的位置无关
fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// 设备 API Key 认证
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    key: String,
}

impl ApiKeyAuth {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let provided = headers
            .get(API_KEY_HEADER)
            .ok_or(AuthError::MissingApiKey)?
            .as_bytes();

        if secure_eq(provided, self.key.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }
}

/// 查询接口的 Bearer Token 认证，未配置 token 时不做检查
#[derive(Debug, Clone, Default)]
pub struct BearerAuth {
    token: Option<String>,
}

impl BearerAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let Some(expected) = &self.token else {
            return Ok(());
        };

        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;

        if secure_eq(token.trim().as_bytes(), expected.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}
