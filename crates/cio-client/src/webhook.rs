//! Webhook signature validation
//!
//! Verifies that a reporting webhook was sent by Customer.io. The service signs
//! `v0:<timestamp>:<raw body>` with HMAC-SHA256 using the workspace's webhook
//! signing key and sends the hex digest in `X-CIO-Signature`.
//!
//! ## Example
//!
//! ```rust
//! use cio_client::webhook::WebhookValidator;
//!
//! let validator = WebhookValidator::new("your-signing-key");
//!
//! let signature = "abc123..."; // From X-CIO-Signature header
//! let timestamp = "1692633432"; // From X-CIO-Timestamp header
//! let body = r#"{"event": "data"}"#;
//!
//! match validator.validate(signature, timestamp, body.as_bytes()) {
//!     Ok(true) => println!("Valid webhook!"),
//!     Ok(false) => println!("Signature mismatch"),
//!     Err(e) => println!("Malformed webhook: {}", e),
//! }
//! ```

use crate::error::{Error, Result};
use chrono::Utc;
use cio_config::CioConfig;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Header name for the webhook signature
pub const SIGNATURE_HEADER: &str = "X-CIO-Signature";

/// Header name for the webhook timestamp
pub const TIMESTAMP_HEADER: &str = "X-CIO-Timestamp";

/// Version tag of the signing scheme
const SCHEME_VERSION: &str = "v0";

/// Compute the lowercase hex signature for a delivery
pub fn compute_signature(signing_key: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(signing_key.as_bytes()).expect("HMAC can take key of any size");

    // Message format: v0:{timestamp}:{body}
    mac.update(SCHEME_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b":");
    mac.update(body);

    hex::encode(mac.finalize().into_bytes())
}

/// Validate a webhook delivery.
///
/// `timestamp` and `signature` are the raw header values; a leading `v0=` is
/// accepted on either. Returns `Ok(false)` for a signature that does not
/// match and `Err` only when the timestamp is not an integer.
pub fn validate_signature(
    signing_key: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
) -> Result<bool> {
    let timestamp = parse_timestamp(timestamp)?;
    let expected = compute_signature(signing_key, timestamp, body);
    let provided = strip_version(signature.trim());

    Ok(expected.as_bytes().ct_eq(provided.as_bytes()).into())
}

fn strip_version(value: &str) -> &str {
    value
        .strip_prefix(SCHEME_VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .unwrap_or(value)
}

fn parse_timestamp(timestamp: &str) -> Result<i64> {
    let raw = strip_version(timestamp.trim());
    raw.parse().map_err(|_| {
        Error::InvalidArgument(format!("Invalid webhook timestamp: {:?}", timestamp))
    })
}

/// Webhook signature validator bound to one signing key
#[derive(Clone)]
pub struct WebhookValidator {
    signing_key: String,
    /// Reject deliveries older than this (disabled by default)
    pub max_age: Option<Duration>,
}

impl WebhookValidator {
    /// Create a new webhook validator with the given signing key
    pub fn new(signing_key: impl Into<String>) -> Self {
        Self {
            signing_key: signing_key.into(),
            max_age: None,
        }
    }

    /// Create a validator from the configured `webhook_signing_key`
    pub fn from_settings(settings: &CioConfig) -> Result<Self> {
        settings
            .webhook_signing_key
            .as_deref()
            .map(Self::new)
            .ok_or_else(|| Error::Config("webhook_signing_key is not configured".to_string()))
    }

    /// Treat deliveries whose timestamp is older than `max_age` as invalid
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Validate a webhook request
    ///
    /// # Arguments
    ///
    /// * `signature` - The value of the X-CIO-Signature header (hex-encoded)
    /// * `timestamp` - The value of the X-CIO-Timestamp header (Unix timestamp in seconds)
    /// * `body` - The raw request body
    pub fn validate(&self, signature: &str, timestamp: &str, body: &[u8]) -> Result<bool> {
        if !validate_signature(&self.signing_key, timestamp, body, signature)? {
            debug!("Webhook signature mismatch");
            return Ok(false);
        }

        if let Some(max_age) = self.max_age {
            let ts = parse_timestamp(timestamp)?;
            let age = Utc::now().timestamp().saturating_sub(ts);
            if age > max_age.as_secs() as i64 {
                debug!(age_secs = age, "Webhook timestamp too old");
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Validate using headers extracted from the request
    pub fn validate_request(&self, headers: &WebhookHeaders, body: &[u8]) -> Result<bool> {
        self.validate(&headers.signature, &headers.timestamp, body)
    }

    /// Sign a body the way the service does, for tests and local tooling.
    ///
    /// Returns (signature, timestamp) tuple.
    pub fn sign(&self, body: &[u8]) -> (String, String) {
        let timestamp = Utc::now().timestamp();
        let signature = compute_signature(&self.signing_key, timestamp, body);
        (signature, timestamp.to_string())
    }
}

impl std::fmt::Debug for WebhookValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookValidator")
            .field("signing_key", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// Helper for extracting webhook headers from HTTP requests
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    pub signature: String,
    pub timestamp: String,
}

impl WebhookHeaders {
    /// Extract webhook headers through a header lookup.
    ///
    /// Works with any header map; the lookup receives the canonical header names.
    pub fn from_headers<F>(get_header: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signature = get_header(SIGNATURE_HEADER).ok_or_else(|| {
            Error::InvalidArgument(format!("Missing required header: {}", SIGNATURE_HEADER))
        })?;

        let timestamp = get_header(TIMESTAMP_HEADER).ok_or_else(|| {
            Error::InvalidArgument(format!("Missing required header: {}", TIMESTAMP_HEADER))
        })?;

        Ok(Self {
            signature,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "secret";
    const TS: &str = "1692633432";
    const BODY: &[u8] = br#"{"key": "value"}"#;
    const EXPECTED: &str = "244b48feb21fcd2887f470c4cfcb3ba40306efa88bbbd592c1e83ebbba87f16d";

    #[test]
    fn test_known_signature() {
        assert_eq!(compute_signature(KEY, 1692633432, BODY), EXPECTED);
        assert!(validate_signature(KEY, TS, BODY, EXPECTED).unwrap());
    }

    #[test]
    fn test_versioned_prefixes_accepted() {
        let prefixed = format!("v0={}", EXPECTED);
        assert!(validate_signature(KEY, TS, BODY, &prefixed).unwrap());
        assert!(validate_signature(KEY, "v0=1692633432", BODY, EXPECTED).unwrap());
    }

    #[test]
    fn test_flipped_bit_rejected() {
        for i in 0..BODY.len() {
            for bit in 0..8 {
                let mut body = BODY.to_vec();
                body[i] ^= 1 << bit;
                assert!(!validate_signature(KEY, TS, &body, EXPECTED).unwrap());
            }
        }
    }

    #[test]
    fn test_mismatch_is_not_an_error() {
        assert!(!validate_signature(KEY, TS, BODY, "invalid-signature").unwrap());
        assert!(!validate_signature(KEY, TS, BODY, "").unwrap());
        assert!(!validate_signature("other-key", TS, BODY, EXPECTED).unwrap());
        assert!(!validate_signature(KEY, "1692633433", BODY, EXPECTED).unwrap());
    }

    #[test]
    fn test_malformed_timestamp_is_an_error() {
        for ts in ["", "abc", "12.5", "v0="] {
            assert!(
                matches!(
                    validate_signature(KEY, ts, BODY, EXPECTED),
                    Err(Error::InvalidArgument(_))
                ),
                "timestamp {:?}",
                ts
            );
        }
    }

    #[test]
    fn test_sign_and_validate() {
        let validator = WebhookValidator::new("test-secret");
        let body = b"test webhook payload";

        let (signature, timestamp) = validator.sign(body);

        assert!(validator.validate(&signature, &timestamp, body).unwrap());
    }

    #[test]
    fn test_max_age() {
        let validator = WebhookValidator::new(KEY).with_max_age(Duration::from_secs(300));
        // fixture timestamp is from 2023
        assert!(!validator.validate(EXPECTED, TS, BODY).unwrap());

        let (signature, timestamp) = validator.sign(BODY);
        assert!(validator.validate(&signature, &timestamp, BODY).unwrap());
    }

    #[test]
    fn test_headers_extraction() {
        let headers = WebhookHeaders::from_headers(|name| match name {
            SIGNATURE_HEADER => Some(EXPECTED.to_string()),
            TIMESTAMP_HEADER => Some(TS.to_string()),
            _ => None,
        })
        .unwrap();

        let validator = WebhookValidator::new(KEY);
        assert!(validator.validate_request(&headers, BODY).unwrap());

        let missing = WebhookHeaders::from_headers(|_| None);
        assert!(matches!(missing, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = CioConfig::default();
        assert!(matches!(
            WebhookValidator::from_settings(&settings),
            Err(Error::Config(_))
        ));

        settings.webhook_signing_key = Some(KEY.to_string());
        let validator = WebhookValidator::from_settings(&settings).unwrap();
        assert!(validator.validate(EXPECTED, TS, BODY).unwrap());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", WebhookValidator::new("very-secret"));
        assert!(!debug.contains("very-secret"));
    }
}
