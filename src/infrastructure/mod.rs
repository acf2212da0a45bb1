//! Infrastructure layer - External service implementations

pub mod cache;
pub mod credential;
pub mod denylist;
pub mod gateway;
pub mod observability;
pub mod storage;
