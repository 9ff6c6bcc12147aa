//! Serial key validation against a key authority.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Status string the authority uses for a usable key.
pub const ACTIVE_STATUS: &str = "active";

/// The authority's answer for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVerdict {
    /// Whether the key may be used.
    pub accepted: bool,
    /// Status reported by the authority (`active`, `expired`, ...).
    pub status: String,
    /// Optional explanation.
    pub message: Option<String>,
}

impl KeyVerdict {
    /// An accepted verdict.
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            status: ACTIVE_STATUS.to_string(),
            message: None,
        }
    }

    /// A rejected verdict with the given status.
    #[must_use]
    pub fn rejected(status: impl Into<String>, message: Option<String>) -> Self {
        Self {
            accepted: false,
            status: status.into(),
            message,
        }
    }
}

/// Something that can judge a serial key.
pub trait KeyValidator: Send + Sync {
    /// Asks whether `serial_key` is valid and active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] when no verdict could be obtained.
    /// A rejected key is a successful call with `accepted == false`.
    fn validate(&self, serial_key: &str) -> Result<KeyVerdict>;
}

/// Request body sent to the authority.
#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    serial_key: &'a str,
    site: &'a str,
}

/// Response body returned by the authority.
#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
}

impl From<ValidateResponse> for KeyVerdict {
    fn from(response: ValidateResponse) -> Self {
        Self {
            accepted: response.valid && response.status == ACTIVE_STATUS,
            status: response.status,
            message: response.message,
        }
    }
}

/// Validates keys with a JSON POST to a remote endpoint.
///
/// Request: `{"serial_key": "...", "site": "..."}`.
/// Response: `{"valid": bool, "status": "active" | ..., "message"?: "..."}`.
/// A key is accepted only when `valid` is true and `status` is `active`.
pub struct HttpKeyValidator {
    client: reqwest::blocking::Client,
    endpoint: String,
    site: String,
}

impl HttpKeyValidator {
    /// Creates a validator for `endpoint`, identifying this installation as
    /// `site`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, site: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            endpoint: endpoint.into(),
            site: site.into(),
        }
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl KeyValidator for HttpKeyValidator {
    fn validate(&self, serial_key: &str) -> Result<KeyVerdict> {
        tracing::info!(endpoint = %self.endpoint, "Validating serial key");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ValidateRequest {
                serial_key,
                site: &self.site,
            })
            .send()
            .map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else {
                    "request"
                };
                tracing::error!(endpoint = %self.endpoint, error = %e, error_kind, "License request failed");
                Error::OperationFailed {
                    operation: "validate_serial_key".to_string(),
                    cause: format!("{error_kind} error: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(endpoint = %self.endpoint, status = %status, "License authority returned error status");
            return Err(Error::OperationFailed {
                operation: "validate_serial_key".to_string(),
                cause: format!("authority returned status {status}"),
            });
        }

        let body: ValidateResponse = response.json().map_err(|e| Error::OperationFailed {
            operation: "parse_license_response".to_string(),
            cause: e.to_string(),
        })?;
        Ok(body.into())
    }
}

fn build_http_client(timeout: Duration) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if !timeout.is_zero() {
        builder = builder.timeout(timeout).connect_timeout(timeout);
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build license HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Accepts a fixed set of keys. For offline installs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyValidator {
    keys: HashSet<String>,
}

impl StaticKeyValidator {
    /// Creates a validator accepting exactly `keys`.
    #[must_use]
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl KeyValidator for StaticKeyValidator {
    fn validate(&self, serial_key: &str) -> Result<KeyVerdict> {
        Ok(if self.keys.contains(serial_key) {
            KeyVerdict::accepted()
        } else {
            KeyVerdict::rejected("invalid", Some("unknown serial key".to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#"{"valid": true, "status": "active"}"#, true ; "active")]
    #[test_case(r#"{"valid": true, "status": "expired"}"#, false ; "expired")]
    #[test_case(r#"{"valid": false, "status": "active"}"#, false ; "invalid but active")]
    #[test_case(r#"{"status": "active"}"#, false ; "valid missing")]
    #[test_case(r#"{}"#, false ; "empty object")]
    fn test_verdict_from_response(body: &str, accepted: bool) {
        let response: ValidateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(KeyVerdict::from(response).accepted, accepted);
    }

    #[test]
    fn test_verdict_keeps_message() {
        let response: ValidateResponse =
            serde_json::from_str(r#"{"valid": false, "status": "revoked", "message": "refunded"}"#)
                .unwrap();
        let verdict = KeyVerdict::from(response);
        assert_eq!(verdict.status, "revoked");
        assert_eq!(verdict.message.as_deref(), Some("refunded"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ValidateRequest {
            serial_key: "ABC-123",
            site: "https://example.org",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"serial_key": "ABC-123", "site": "https://example.org"})
        );
    }

    #[test]
    fn test_static_validator() {
        let validator = StaticKeyValidator::new(["GOOD-KEY"]);
        assert!(validator.validate("GOOD-KEY").unwrap().accepted);
        assert!(!validator.validate("BAD-KEY").unwrap().accepted);
    }

    #[test]
    fn test_unreachable_authority_is_an_error() {
        // Port 9 (discard) on localhost is almost never listening.
        let validator = HttpKeyValidator::new(
            "http://127.0.0.1:9/validate",
            "test",
            Duration::from_millis(500),
        );
        assert!(matches!(
            validator.validate("KEY"),
            Err(Error::OperationFailed { .. })
        ));
        assert_eq!(validator.endpoint(), "http://127.0.0.1:9/validate");
    }
}
