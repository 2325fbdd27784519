//! Client session: the shared HTTP request executor
//!
//! Every public client method funnels through [`ClientSession::send`], which:
//! - reuses one lazily-built transport (connection pool) per session
//! - stamps each call with `X-Request-Id`, `X-Timestamp` and `User-Agent`
//! - merges caller headers on top of the defaults
//! - issues exactly one HTTP call and classifies the outcome
//!
//! No retry happens here. Retryable failures are reported through
//! [`Error::is_retryable`](crate::Error::is_retryable) so the caller can apply
//! its own policy.

use crate::config::SessionConfig;
use crate::endpoint::{join_url, parse_base_url};
use crate::error::{Error, Result};
use crate::request::RequestDescription;
use chrono::Utc;
use parking_lot::Mutex;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::StatusCode;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Unique id attached to every request for tracing
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Call time in integer seconds since the Unix epoch (UTC)
pub const TIMESTAMP_HEADER: &str = "x-timestamp";

/// Successful response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `None` when the body is empty or not declared as JSON
    pub body: Option<serde_json::Value>,
}

enum Transport {
    Idle,
    Ready(reqwest::Client),
    Closed,
}

/// One logical client's connection context.
///
/// Base URL, configuration and the cached `User-Agent` are immutable after
/// construction. The transport is built on first use and shared by every
/// concurrent `send`; `close` releases it for good.
pub struct ClientSession {
    base_url: Url,
    config: SessionConfig,
    user_agent: HeaderValue,
    transport: Mutex<Transport>,
    permits: Semaphore,
}

impl ClientSession {
    /// Create a session for `base_url`. No connection is opened yet.
    pub fn new(base_url: &str, config: SessionConfig) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        if config.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }

        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|_| {
            Error::Config(format!("invalid user agent: {:?}", config.user_agent))
        })?;

        let permits = Semaphore::new(config.max_connections);

        Ok(Self {
            base_url,
            config,
            user_agent,
            transport: Mutex::new(Transport::Idle),
            permits,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.transport.lock(), Transport::Closed)
    }

    /// Release the transport and its pooled connections.
    ///
    /// Requests already in flight finish on their own handle; every later
    /// `send`, and every `send` still waiting for a connection slot, fails
    /// with [`Error::SessionClosed`].
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.transport.lock(), Transport::Closed);
        self.permits.close();

        if matches!(previous, Transport::Ready(_)) {
            info!(base_url = %self.base_url, "Client session closed");
        }
    }

    /// Execute one request and classify the result
    pub async fn send(&self, request: &RequestDescription) -> Result<ApiResponse> {
        // Fail fast on a closed session before queueing for a slot
        self.transport()?;

        let url = join_url(&self.base_url, &request.path, &request.query)?;
        let body = match &request.body {
            Some(body) => Some(serde_json::to_vec(body)?),
            None => None,
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::SessionClosed)?;
        let client = self.transport()?;

        let headers = self.build_headers(request)?;
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        debug!(
            method = %request.method,
            url = %url,
            request_id = %request_id,
            has_body = body.is_some(),
            "Sending request"
        );

        let mut builder = client.request(request.method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            let err = Error::from_transport(e);
            warn!(
                request_id = %request_id,
                url = %url,
                retryable = err.is_retryable(),
                error = %err,
                "Request failed"
            );
            err
        })?;

        let status = response.status();
        let response_headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(Error::from_transport)?;

        debug!(
            request_id = %request_id,
            status_code = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Response received"
        );

        classify(status, &response_headers, &bytes).inspect_err(|err| {
            warn!(
                request_id = %request_id,
                status_code = status.as_u16(),
                retryable = err.is_retryable(),
                "Request rejected"
            );
        })
    }

    /// Build the headers for one call.
    ///
    /// Defaults first, then auth, then the caller's extra headers, which win
    /// on conflict. `request` is only read, so the caller's map is never
    /// touched, and every call gets a fresh request id.
    pub fn build_headers(&self, request: &RequestDescription) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let request_id = HeaderValue::from_str(&Uuid::new_v4().to_string())
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), request_id);
        headers.insert(
            HeaderName::from_static(TIMESTAMP_HEADER),
            HeaderValue::from(Utc::now().timestamp()),
        );
        headers.insert(USER_AGENT, self.user_agent.clone());

        if request.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(auth) = &request.auth {
            headers.insert(AUTHORIZATION, auth.header_value()?);
        }

        for name in request.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in request.headers.iter() {
            headers.append(name.clone(), value.clone());
        }

        Ok(headers)
    }

    /// Shared transport, built on first use
    fn transport(&self) -> Result<reqwest::Client> {
        let mut state = self.transport.lock();
        match &*state {
            Transport::Ready(client) => Ok(client.clone()),
            Transport::Closed => Err(Error::SessionClosed),
            Transport::Idle => {
                let client = build_client(&self.config)?;
                debug!(
                    base_url = %self.base_url,
                    max_connections = self.config.max_connections,
                    max_keepalive_connections = self.config.max_keepalive_connections,
                    "HTTP transport created"
                );
                *state = Transport::Ready(client.clone());
                Ok(client)
            }
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn build_client(config: &SessionConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(config.max_keepalive_connections)
        .build()
        .map_err(Error::Http)
}

/// Map a received response onto success or a classified error
pub(crate) fn classify(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Result<ApiResponse> {
    if status.is_success() {
        let has_body = body.iter().any(|b| !b.is_ascii_whitespace());
        let parsed = if has_body && declares_json(headers) {
            Some(serde_json::from_slice(body)?)
        } else {
            None
        };
        return Ok(ApiResponse {
            status: status.as_u16(),
            body: parsed,
        });
    }

    let message = String::from_utf8_lossy(body).into_owned();
    Err(Error::from_status(status, headers, message))
}

fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let essence = v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
            essence == "application/json" || essence.ends_with("+json")
        })
        .unwrap_or(false)
}
