use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// 令牌桶限流器
///
/// 令牌数用浮点保存，低速率（如 100 次 / 15 分钟）也能按比例补充。
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64, // tokens per second
    state: Mutex<TokenState>,
}

struct TokenState {
    current: f64,
    last_refill: Instant,
    last_used: Instant,
}

impl TokenBucket {
    /// 创建新的令牌桶（初始为满）
    pub fn new(capacity: u64, refill_rate: f64) -> Self {
        let now = Instant::now();
        Self {
            capacity: capacity as f64,
            refill_rate: refill_rate.max(0.0),
            state: Mutex::new(TokenState {
                current: capacity as f64,
                last_refill: now,
                last_used: now,
            }),
        }
    }

    /// 尝试获取指定数量的令牌（非阻塞）
    pub async fn try_acquire(&self, tokens: u64) -> bool {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        self.refill(&mut state, now);
        state.last_used = now;

        let wanted = tokens as f64;
        if state.current >= wanted {
            state.current -= wanted;
            debug!(tokens, remaining = state.current, "Tokens acquired");
            true
        } else {
            debug!(tokens, available = state.current, "Insufficient tokens");
            false
        }
    }

    fn refill(&self, state: &mut TokenState, now: Instant) {
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.current = (state.current + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }

    /// 获取当前可用的整令牌数
    pub async fn available(&self) -> u64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());
        state.current.floor() as u64
    }

    /// 距离下一个令牌可用的时间
    pub async fn time_until_available(&self) -> Duration {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());
        if state.current >= 1.0 || self.refill_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((1.0 - state.current) / self.refill_rate)
    }

    /// 最近一次取令牌距今的时间
    pub async fn idle_for(&self) -> Duration {
        self.state.lock().await.last_used.elapsed()
    }
}
