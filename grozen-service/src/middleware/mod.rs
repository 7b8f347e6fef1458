pub mod admin;
pub mod auth;
pub mod metrics;

pub use admin::admin_middleware;
pub use auth::{auth_middleware, AuthUser, Claims};
pub use metrics::metrics_middleware;
