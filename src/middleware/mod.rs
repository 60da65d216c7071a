//! Middleware components for HTTP request processing.
//!
//! Cross-cutting concerns layered onto the router: client identification,
//! authentication extractors, and the fixed-window rate limiter that gates
//! every inbound request.

pub mod auth;
pub mod ip;
pub mod rate_limit;

pub use rate_limit::RateLimiter;
