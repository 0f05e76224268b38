pub mod limiter;
pub mod middleware;
pub mod strategy;
pub mod token_bucket;

pub use limiter::RateLimiter;
pub use middleware::{client_key, rate_limit_middleware};
pub use strategy::RateLimitStrategy;
pub use token_bucket::TokenBucket;
