use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::errors::ProxyError;

/// Errors that can occur when calling the upstream stock-data API
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Client error other than 429 (HTTP 400-499)
    #[error("Upstream rejected request ({0})")]
    ClientError(StatusCode),

    /// Rate limit exceeded upstream (HTTP 429)
    #[error("Upstream rate limit exceeded")]
    RateLimited,

    /// Retryable server error (HTTP 500, 502, 503, 504)
    #[error("Upstream server error ({0})")]
    ServerError(StatusCode),

    /// Any other non-success status
    #[error("Unexpected upstream status ({0})")]
    UnexpectedStatus(StatusCode),

    /// Request exceeded the configured timeout
    #[error("Upstream request timed out")]
    Timeout,

    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Body was not the expected `{ success, data }` shape
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Upstream answered `success: false`
    #[error("Upstream reported failure: {0}")]
    Rejected(String),

    /// Base URL could not be combined with the resource path
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}

impl UpstreamError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimited,
            500 | 502 | 503 | 504 => Self::ServerError(status),
            400..=499 => Self::ClientError(status),
            _ => Self::UnexpectedStatus(status),
        }
    }

    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError(_) | Self::Timeout | Self::Network(_)
        )
    }

    /// Returns true if this is a permanent error that should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err)
        }
    }
}

impl From<UpstreamError> for ProxyError {
    fn from(err: UpstreamError) -> Self {
        let (status, message) = match &err {
            UpstreamError::ClientError(status) if *status == StatusCode::NOT_FOUND => {
                (404, "Stock data not found upstream".to_string())
            }
            UpstreamError::ClientError(status) => (
                status.as_u16(),
                "Upstream rejected the request".to_string(),
            ),
            UpstreamError::Timeout => (504, "Upstream request timed out".to_string()),
            UpstreamError::RateLimited
            | UpstreamError::ServerError(_)
            | UpstreamError::Network(_) => (
                502,
                "Failed to fetch stock data from upstream".to_string(),
            ),
            UpstreamError::InvalidResponse(_) | UpstreamError::Rejected(_) => (
                502,
                "Upstream returned an unusable response".to_string(),
            ),
            UpstreamError::UnexpectedStatus(_) | UpstreamError::InvalidUrl(_) => {
                (500, "Internal error while fetching stock data".to_string())
            }
        };
        Self::Upstream { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        for code in [500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(UpstreamError::from_status(status).is_transient(), "{code}");
        }
        assert!(UpstreamError::from_status(StatusCode::TOO_MANY_REQUESTS).is_transient());

        for code in [400, 401, 403, 404, 422] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(UpstreamError::from_status(status).is_permanent(), "{code}");
        }
        // Unclassified statuses default to terminal.
        assert!(UpstreamError::from_status(StatusCode::NOT_IMPLEMENTED).is_permanent());
        assert!(UpstreamError::from_status(StatusCode::MOVED_PERMANENTLY).is_permanent());
    }

    #[test]
    fn test_timeout_is_transient() {
        assert!(UpstreamError::Timeout.is_transient());
        assert!(UpstreamError::Rejected("nope".into()).is_permanent());
    }

    #[test]
    fn test_mapping_to_proxy_error() {
        let not_found = ProxyError::from(UpstreamError::ClientError(StatusCode::NOT_FOUND));
        assert_eq!(not_found.status_code(), 404);

        let forbidden = ProxyError::from(UpstreamError::ClientError(StatusCode::FORBIDDEN));
        assert_eq!(forbidden.status_code(), 403);

        assert_eq!(ProxyError::from(UpstreamError::Timeout).status_code(), 504);
        assert_eq!(
            ProxyError::from(UpstreamError::ServerError(StatusCode::BAD_GATEWAY)).status_code(),
            502
        );
        assert_eq!(
            ProxyError::from(UpstreamError::UnexpectedStatus(StatusCode::NOT_IMPLEMENTED))
                .status_code(),
            500
        );
    }

    #[test]
    fn test_mapping_does_not_leak_upstream_text() {
        let err = ProxyError::from(UpstreamError::Rejected("secret internal detail".into()));
        assert!(!err.to_string().contains("secret"));
    }
}
