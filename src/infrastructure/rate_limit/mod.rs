//! Per-client request rate limiting.

pub mod fixed_window;

pub use fixed_window::{FixedWindowRateLimiter, RateLimitDecision, RateLimitWindow};
