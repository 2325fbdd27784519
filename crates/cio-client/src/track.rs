//! Track API (v1) client
//!
//! Authenticates with HTTP Basic auth (site id / API key) and talks to
//! `https://<track host>/api/v1`. Every operation validates its identifiers
//! before any I/O and returns `()` on success.

use crate::config::TrackConfig;
use crate::error::{Error, Result};
use crate::identifiers::PersonIdentifier;
use crate::payload::{sanitize, EventTimestamp};
use crate::request::{Auth, RequestDescription};
use crate::session::{ApiResponse, ClientSession};
use crate::track_v2::TrackV2;
use cio_config::CioConfig;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Async client for the Track API
#[derive(Debug, Clone)]
pub struct TrackClient {
    session: Arc<ClientSession>,
    auth: Auth,
    v1_prefix: Vec<String>,
    v2_prefix: Vec<String>,
}

impl TrackClient {
    /// Create a client. No connection is opened until the first call.
    pub fn new(config: TrackConfig) -> Result<Self> {
        let session = ClientSession::new(&config.get_base_url(), config.session.clone())?;

        Ok(Self {
            session: Arc::new(session),
            auth: Auth::basic(config.site_id.clone(), config.api_key.clone()),
            v1_prefix: config.v1_prefix(),
            v2_prefix: config.v2_prefix(),
        })
    }

    /// Create a client from loaded settings
    pub fn from_settings(settings: &CioConfig) -> Result<Self> {
        Self::new(TrackConfig::from_settings(settings)?)
    }

    /// The v2 entity/batch API, sharing this client's session and credentials
    pub fn v2(&self) -> TrackV2<'_> {
        TrackV2::new(self)
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Release pooled connections; later calls fail with `SessionClosed`
    pub fn close(&self) {
        self.session.close();
    }

    /// Create or update a person, setting the given attributes
    pub async fn identify<T>(&self, customer_id: &str, attributes: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        require("identifier", customer_id, "identify")?;

        let request = RequestDescription::put(self.v1_path(&["customers", customer_id]))
            .with_body(Value::Object(sanitize(attributes)?));
        self.execute(request).await
    }

    /// Track a named event for a person
    pub async fn track<T>(&self, customer_id: &str, name: &str, data: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        require("customer_id", customer_id, "track")?;

        let body = json!({ "name": name, "data": sanitize(data)? });
        let request = RequestDescription::post(self.v1_path(&["customers", customer_id, "events"]))
            .with_body(body);
        self.execute(request).await
    }

    /// Track an event for someone not identified yet.
    ///
    /// An empty `anonymous_id` sends the event without one.
    pub async fn track_anonymous<T>(&self, anonymous_id: &str, name: &str, data: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let mut body = json!({ "name": name, "data": sanitize(data)? });
        if !anonymous_id.is_empty() {
            body["anonymous_id"] = Value::from(anonymous_id);
        }

        let request = RequestDescription::post(self.v1_path(&["events"])).with_body(body);
        self.execute(request).await
    }

    /// Track a page view for a person
    pub async fn pageview<T>(&self, customer_id: &str, page: &str, data: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        require("customer_id", customer_id, "pageview")?;

        let body = json!({ "type": "page", "name": page, "data": sanitize(data)? });
        let request = RequestDescription::post(self.v1_path(&["customers", customer_id, "events"]))
            .with_body(body);
        self.execute(request).await
    }

    /// Track an event that happened in the past
    pub async fn backfill<T>(
        &self,
        customer_id: &str,
        name: &str,
        timestamp: impl Into<EventTimestamp>,
        data: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        require("customer_id", customer_id, "backfill")?;

        let EventTimestamp(timestamp) = timestamp.into();
        let body = json!({
            "name": name,
            "data": sanitize(data)?,
            "timestamp": timestamp,
        });
        let request = RequestDescription::post(self.v1_path(&["customers", customer_id, "events"]))
            .with_body(body);
        self.execute(request).await
    }

    /// Delete a person and everything stored about them
    pub async fn delete(&self, customer_id: &str) -> Result<()> {
        require("customer_id", customer_id, "delete")?;

        let request = RequestDescription::delete(self.v1_path(&["customers", customer_id]));
        self.execute(request).await
    }

    /// Add or update a device on a person. `platform` is `ios` or `android`.
    pub async fn add_device<T>(
        &self,
        customer_id: &str,
        device_id: &str,
        platform: &str,
        data: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        require("customer_id", customer_id, "add_device")?;
        require("device_id", device_id, "add_device")?;
        require("platform", platform, "add_device")?;

        let mut device = sanitize(data)?;
        device.insert("id".to_string(), Value::from(device_id));
        device.insert("platform".to_string(), Value::from(platform));

        let request = RequestDescription::put(self.v1_path(&["customers", customer_id, "devices"]))
            .with_body(json!({ "device": device }));
        self.execute(request).await
    }

    pub async fn delete_device(&self, customer_id: &str, device_id: &str) -> Result<()> {
        require("customer_id", customer_id, "delete_device")?;
        require("device_id", device_id, "delete_device")?;

        let request = RequestDescription::delete(
            self.v1_path(&["customers", customer_id, "devices", device_id]),
        );
        self.execute(request).await
    }

    /// Delete a person and keep their identifier from being added again
    pub async fn suppress(&self, customer_id: &str) -> Result<()> {
        require("customer_id", customer_id, "suppress")?;

        let request =
            RequestDescription::post(self.v1_path(&["customers", customer_id, "suppress"]));
        self.execute(request).await
    }

    /// Make a suppressed identifier usable again. Does not restore the old profile.
    pub async fn unsuppress(&self, customer_id: &str) -> Result<()> {
        require("customer_id", customer_id, "unsuppress")?;

        let request =
            RequestDescription::post(self.v1_path(&["customers", customer_id, "unsuppress"]));
        self.execute(request).await
    }

    /// Merge `secondary` into `primary`. The secondary profile is deleted; not reversible.
    pub async fn merge_customers(
        &self,
        primary: &PersonIdentifier,
        secondary: &PersonIdentifier,
    ) -> Result<()> {
        if primary.is_blank() {
            return Err(Error::InvalidArgument(
                "primary customer_id cannot be blank".to_string(),
            ));
        }
        if secondary.is_blank() {
            return Err(Error::InvalidArgument(
                "secondary customer_id cannot be blank".to_string(),
            ));
        }

        let body = json!({ "primary": primary, "secondary": secondary });
        let request = RequestDescription::post(self.v1_path(&["merge_customers"])).with_body(body);
        self.execute(request).await
    }

    /// Send with this client's credentials and discard the response body
    pub(crate) async fn execute(&self, request: RequestDescription) -> Result<()> {
        self.send_authenticated(request).await?;
        Ok(())
    }

    pub(crate) async fn send_authenticated(
        &self,
        request: RequestDescription,
    ) -> Result<ApiResponse> {
        let request = request.with_auth(self.auth.clone());
        self.session.send(&request).await
    }

    fn v1_path(&self, segments: &[&str]) -> Vec<String> {
        with_prefix(&self.v1_prefix, segments)
    }

    pub(crate) fn v2_path(&self, segments: &[&str]) -> Vec<String> {
        with_prefix(&self.v2_prefix, segments)
    }
}

fn with_prefix(prefix: &[String], segments: &[&str]) -> Vec<String> {
    prefix
        .iter()
        .cloned()
        .chain(segments.iter().map(|s| s.to_string()))
        .collect()
}

/// Reject blank identifiers before any request is built
pub(crate) fn require(field: &str, value: &str, operation: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!(
            "{} cannot be blank in {}",
            field, operation
        )));
    }
    Ok(())
}
