//! The uniform JSON wrapper returned by every proxy route.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Response metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMeta {
    /// Symbol as requested (normalised when valid)
    pub symbol: String,
    /// RFC 3339 time at which the upstream data was read
    pub fetched_at: String,
    /// Whether the data came from the cache
    pub cached: bool,
}

/// `{ success, data?, error?, message?, meta }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEnvelope<V> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<V>,
    /// Machine-readable error code on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Request metadata
    pub meta: EnvelopeMeta,
}

impl<V> ProxyEnvelope<V> {
    /// Successful envelope carrying `data`.
    pub fn ok(symbol: impl Into<String>, data: V, fetched_at: DateTime<Utc>, cached: bool) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            meta: EnvelopeMeta {
                symbol: symbol.into(),
                fetched_at: format_timestamp(fetched_at),
                cached,
            },
        }
    }

    /// Failed envelope with an error code and message.
    pub fn failure(
        symbol: impl Into<String>,
        error: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: Some(message.into()),
            meta: EnvelopeMeta {
                symbol: symbol.into(),
                fetched_at: format_timestamp(Utc::now()),
                cached: false,
            },
        }
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_serialises_camel_case_without_error_fields() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let envelope = ProxyEnvelope::ok("PTT", json!({"price": 34.75}), at, true);

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "data": {"price": 34.75},
                "meta": {
                    "symbol": "PTT",
                    "fetchedAt": "2024-03-01T09:30:00.000Z",
                    "cached": true
                }
            })
        );
    }

    #[test]
    fn test_failure_has_no_data() {
        let envelope: ProxyEnvelope<serde_json::Value> =
            ProxyEnvelope::failure("??", "INVALID_SYMBOL", "bad symbol");

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value.get("data").is_none());
        assert_eq!(value["error"], json!("INVALID_SYMBOL"));
        assert_eq!(value["meta"]["cached"], json!(false));
    }
}
