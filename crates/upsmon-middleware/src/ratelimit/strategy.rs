use std::time::Duration;

/// 限流策略
#[derive(Debug, Clone, PartialEq)]
pub enum RateLimitStrategy {
    /// 按客户端 IP 限流
    ByIp { max_requests: u64, window: Duration },

    /// 全局限流
    Global { max_requests: u64, window: Duration },
}

impl RateLimitStrategy {
    /// 创建按 IP 限流策略
    pub fn by_ip(max_requests: u64, window: Duration) -> Self {
        Self::ByIp {
            max_requests,
            window,
        }
    }

    /// 创建全局限流策略
    pub fn global(max_requests: u64, window: Duration) -> Self {
        Self::Global {
            max_requests,
            window,
        }
    }

    /// 令牌桶的键
    pub(crate) fn bucket_key(&self, key: &str) -> String {
        match self {
            Self::ByIp { .. } => format!("ip:{}", key),
            Self::Global { .. } => "global".to_string(),
        }
    }

    pub fn capacity(&self) -> u64 {
        match self {
            Self::ByIp { max_requests, .. } | Self::Global { max_requests, .. } => *max_requests,
        }
    }

    /// 每秒补充的令牌数
    pub fn refill_rate(&self) -> f64 {
        match self {
            Self::ByIp {
                max_requests,
                window,
            }
            | Self::Global {
                max_requests,
                window,
            } => {
                let secs = window.as_secs_f64();
                if secs > 0.0 {
                    *max_requests as f64 / secs
                } else {
                    0.0
                }
            }
        }
    }
}
