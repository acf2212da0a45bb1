//! Gateway pipeline types shared by the authenticator, limiter and handlers

mod context;
mod error;
mod request;

pub use context::{AuditEntry, AuditReason, CheckOutcome, CheckRecord, RequestContext};
pub(crate) use context::duration_ms;
pub use error::{AuthErrorKind, GatewayError, ValidationKind};
pub use request::SignedRequest;
