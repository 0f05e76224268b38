pub mod api_key;
pub mod middleware;

pub use api_key::{ApiKeyAuth, AuthError, BearerAuth};
pub use middleware::{api_key_middleware, bearer_middleware};
