//! Domain errors for the stock-data proxy.

use thiserror::Error;

/// Failures surfaced by the proxy pipeline.
///
/// Every variant maps to an HTTP status and an envelope error code; nothing
/// leaves the route boundary in any other form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    /// Symbol failed validation; holds the rejected text
    #[error("Invalid symbol '{0}': expected 1-10 ASCII letters or digits")]
    InvalidSymbol(String),

    /// A query parameter could not be used
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Client exhausted its request window
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window resets
        retry_after_secs: u64,
    },

    /// Upstream failed or rejected the request
    #[error("{message}")]
    Upstream {
        /// Status returned to the caller
        status: u16,
        /// Human-readable description
        message: String,
    },
}

pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    /// HTTP status for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidSymbol(_) | Self::InvalidParameter { .. } => 400,
            Self::RateLimited { .. } => 429,
            Self::Upstream { status, .. } => *status,
        }
    }

    /// Machine-readable code placed in the envelope's `error` field.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSymbol(_) => "INVALID_SYMBOL",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Upstream { status, .. } => match *status {
                404 => "NOT_FOUND",
                400..=499 => "UPSTREAM_REJECTED",
                504 => "UPSTREAM_TIMEOUT",
                502 => "UPSTREAM_UNAVAILABLE",
                _ => "INTERNAL_ERROR",
            },
        }
    }

    /// `Retry-After` hint in seconds, only for rate-limit errors.
    pub const fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}
