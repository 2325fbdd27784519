//! # Customer.io client for Rust
//!
//! Async client for the Customer.io Track and App APIs.
//!
//! ## Features
//!
//! - **Client session**: one pooled HTTP transport per client, bounded concurrency,
//!   per-request `X-Request-Id` / `X-Timestamp` headers and retryable/fatal error
//!   classification. The caller owns the retry policy.
//! - **Track API**: v1 people, events and devices, plus the v2 entity and batch endpoints
//! - **App API**: transactional email, push and SMS
//! - **Webhook Validation**: HMAC-SHA256 signature verification for reporting webhooks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cio_client::{TrackClient, TrackConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TrackClient::new(TrackConfig::new("site_id", "api_key"))?;
//!
//!     client.identify("42", &json!({"email": "jane@example.com"})).await?;
//!
//!     match client.track("42", "purchase", &json!({"amount": 10})).await {
//!         Ok(()) => {}
//!         Err(e) if e.is_retryable() => println!("try again later: {}", e),
//!         Err(e) => return Err(e.into()),
//!     }
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod identifiers;
pub mod payload;
pub mod request;
pub mod session;
pub mod track;
pub mod track_v2;
#[cfg(feature = "webhook")]
pub mod webhook;

// Re-export main types
pub use api::{ApiClient, SendEmailRequest, SendPushRequest, SendSmsRequest};
pub use cio_config::{CioConfig, ConfigLoader, Region};
pub use config::{ApiConfig, SessionConfig, TrackConfig};
pub use endpoint::join_url;
pub use error::{Error, ErrorKind, Result};
pub use identifiers::{Identifiers, ObjectIdentifier, PersonIdentifier, Relationship};
pub use payload::{datetime_to_timestamp, sanitize, Attributes};
pub use request::{Auth, RequestDescription};
pub use session::{ApiResponse, ClientSession};
pub use track::TrackClient;
pub use track_v2::{Action, EntityPayload, TrackV2};
#[cfg(feature = "webhook")]
pub use webhook::{validate_signature, WebhookValidator};
