//! API middleware and extractors

pub mod admin_auth;
pub mod logging;
pub mod metrics;
pub mod security;
pub mod signed_request;

pub use admin_auth::RequireAdmin;
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
pub use security::{security_headers_middleware, MAX_BODY_SIZE};
pub use signed_request::SignedCheck;
