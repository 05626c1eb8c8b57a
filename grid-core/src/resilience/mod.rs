//! Resilience patterns wrapping outbound exchange calls, so every outbound
//! call has a bounded timeout and a failing exchange can't be hammered
//! indefinitely.
//!
//! - Exponential backoff for retries
//! - Circuit breaker to stop hammering a failing exchange

pub mod backoff;
pub mod circuit_breaker;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
