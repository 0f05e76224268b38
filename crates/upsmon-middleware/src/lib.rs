pub mod auth;
pub mod ratelimit;

pub use auth::{api_key_middleware, bearer_middleware, ApiKeyAuth, AuthError, BearerAuth};
pub use ratelimit::{rate_limit_middleware, RateLimitStrategy, RateLimiter, TokenBucket};
