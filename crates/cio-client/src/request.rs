//! Request descriptions handed to a [`ClientSession`](crate::ClientSession)

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use std::fmt;

/// Credentials attached to a single request
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP Basic auth (Track API: site id / API key)
    Basic { username: String, password: String },
    /// `Authorization: Bearer <token>` (App API)
    Bearer(String),
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    /// Value for the `Authorization` header, marked sensitive
    pub fn header_value(&self) -> Result<HeaderValue> {
        let raw = match self {
            Auth::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
            }
            Auth::Bearer(token) => format!("Bearer {}", token),
        };
        let mut value = HeaderValue::from_str(&raw).map_err(|_| {
            Error::InvalidArgument("credentials contain characters not allowed in a header".to_string())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Auth::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// One logical HTTP call: method, path relative to the session's base URL,
/// credentials, extra headers and an optional JSON body.
///
/// The body is a `serde_json::Value`, so it is serializable by construction;
/// callers sanitize payloads before building it.
#[derive(Debug, Clone)]
pub struct RequestDescription {
    pub method: Method,
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub auth: Option<Auth>,
    /// Merged over the session defaults; these win on conflict
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl RequestDescription {
    pub fn new<I, S>(method: Method, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            path: path.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            auth: None,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, path)
    }

    pub fn post<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, path)
    }

    pub fn put<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::PUT, path)
    }

    pub fn delete<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::DELETE, path)
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Add an extra header, replacing any earlier value for the same name
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `payload` into the request body
    pub fn with_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        let body = serde_json::to_value(payload)?;
        Ok(self.with_body(body))
    }
}
