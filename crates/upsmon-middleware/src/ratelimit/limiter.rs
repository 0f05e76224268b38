use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{RateLimitStrategy, TokenBucket};

/// 限流器
#[derive(Clone)]
pub struct RateLimiter {
    strategies: Vec<RateLimitStrategy>,
    buckets: Arc<RwLock<HashMap<String, Arc<TokenBucket>>>>,
}

impl RateLimiter {
    /// 创建新的限流器
    pub fn new(strategies: Vec<RateLimitStrategy>) -> Self {
        Self {
            strategies,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 检查是否允许请求
    pub async fn check(&self, key: &str) -> bool {
        for strategy in &self.strategies {
            let bucket = self.bucket(strategy, key).await;
            if !bucket.try_acquire(1).await {
                warn!(key = key, strategy = ?strategy, "Rate limit exceeded");
                return false;
            }
        }
        true
    }

    /// 被拒绝后建议的重试等待时间
    pub async fn retry_after(&self, key: &str) -> Duration {
        let mut longest = Duration::ZERO;
        for strategy in &self.strategies {
            let bucket = self.bucket(strategy, key).await;
            longest = longest.max(bucket.time_until_available().await);
        }
        longest
    }

    async fn bucket(&self, strategy: &RateLimitStrategy, key: &str) -> Arc<TokenBucket> {
        let bucket_key = strategy.bucket_key(key);
        if let Some(bucket) = self.buckets.read().await.get(&bucket_key) {
            return bucket.clone();
        }

        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket_key)
            .or_insert_with(|| {
                Arc::new(TokenBucket::new(
                    strategy.capacity(),
                    strategy.refill_rate(),
                ))
            })
            .clone()
    }

    /// 清理长时间未使用的令牌桶，返回清理数量
    pub async fn cleanup(&self, max_idle: Duration) -> usize {
        let snapshot: Vec<(String, Arc<TokenBucket>)> = self
            .buckets
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut idle = Vec::new();
        for (key, bucket) in snapshot {
            if bucket.idle_for().await >= max_idle {
                idle.push(key);
            }
        }

        let mut buckets = self.buckets.write().await;
        for key in &idle {
            buckets.remove(key);
        }
        debug!(removed = idle.len(), remaining = buckets.len(), "Rate limiter buckets cleaned");
        idle.len()
    }

    /// 启动后台清理任务
    pub fn spawn_cleanup(&self, interval: Duration, max_idle: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.cleanup(max_idle).await;
            }
        })
    }

    pub async fn bucket_count(&self) -> usize {
        self.buckets.read().await.len()
    }
}
