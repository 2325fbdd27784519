//! App API client for transactional messages
//!
//! Authenticates with a bearer App API key and posts to
//! `https://<api host>/v1/send/{email,push,sms}`.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::identifiers::PersonIdentifier;
use crate::payload::Attributes;
use crate::request::{Auth, RequestDescription};
use crate::session::ClientSession;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cio_config::CioConfig;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Transactional email
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendEmailRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactional_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<PersonIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preheader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_amp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_plain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fake_bcc: Option<String>,
    pub disable_message_retention: bool,
    pub send_to_unsubscribed: bool,
    pub tracked: bool,
    pub queue_draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_data: Option<Attributes>,
    /// File name to base64 content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<BTreeMap<String, String>>,
    // field name as the service spells it
    #[serde(rename = "disable_css_preproceessing")]
    pub disable_css_preprocessing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Default for SendEmailRequest {
    fn default() -> Self {
        Self {
            transactional_message_id: None,
            to: None,
            identifiers: None,
            from: None,
            headers: None,
            reply_to: None,
            bcc: None,
            subject: None,
            preheader: None,
            body: None,
            body_amp: None,
            body_plain: None,
            fake_bcc: None,
            disable_message_retention: false,
            send_to_unsubscribed: true,
            tracked: true,
            queue_draft: false,
            message_data: None,
            attachments: None,
            disable_css_preprocessing: false,
            send_at: None,
            language: None,
        }
    }
}

impl SendEmailRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a transactional template
    pub fn with_message_id(mut self, id: impl ToString) -> Self {
        self.transactional_message_id = Some(id.to_string());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_identifiers(mut self, identifiers: PersonIdentifier) -> Self {
        self.identifiers = Some(identifiers);
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_message_data(mut self, data: Attributes) -> Self {
        self.message_data = Some(data);
        self
    }

    /// Attach raw content, base64-encoding it. Names must be unique.
    pub fn attach(&mut self, name: impl Into<String>, content: impl AsRef<[u8]>) -> Result<()> {
        let encoded = STANDARD.encode(content.as_ref());
        self.attach_encoded(name, encoded)
    }

    /// Attach content that is already base64-encoded
    pub fn attach_encoded(&mut self, name: impl Into<String>, content: impl Into<String>) -> Result<()> {
        let name = name.into();
        let attachments = self.attachments.get_or_insert_with(BTreeMap::new);
        if attachments.contains_key(&name) {
            return Err(Error::InvalidArgument(format!(
                "attachment {} already exists",
                name
            )));
        }
        attachments.insert(name, content.into());
        Ok(())
    }
}

/// Device targeted by a push when it is not on the person's profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomDevice {
    pub token: String,
    /// `ios` or `android`
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

/// Transactional push notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendPushRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactional_message_id: Option<String>,
    /// `all`, `last_used` or a device token
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<PersonIdentifier>,
    pub disable_message_retention: bool,
    pub send_to_unsubscribed: bool,
    pub queue_draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_data: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_payload: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_device: Option<CustomDevice>,
    pub sound: String,
}

impl Default for SendPushRequest {
    fn default() -> Self {
        Self {
            transactional_message_id: None,
            to: "all".to_string(),
            identifiers: None,
            disable_message_retention: false,
            send_to_unsubscribed: true,
            queue_draft: false,
            message_data: None,
            send_at: None,
            language: None,
            title: None,
            message: None,
            image_url: None,
            link: None,
            custom_data: None,
            custom_payload: None,
            custom_device: None,
            sound: "default".to_string(),
        }
    }
}

impl SendPushRequest {
    pub fn new(transactional_message_id: impl ToString, identifiers: PersonIdentifier) -> Self {
        Self {
            transactional_message_id: Some(transactional_message_id.to_string()),
            identifiers: Some(identifiers),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_device(mut self, device: CustomDevice) -> Self {
        self.custom_device = Some(device);
        self
    }
}

/// Transactional SMS
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendSmsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactional_message_id: Option<String>,
    /// Phone number in E.164 format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<PersonIdentifier>,
    pub disable_message_retention: bool,
    pub send_to_unsubscribed: bool,
    pub queue_draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_data: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Default for SendSmsRequest {
    fn default() -> Self {
        Self {
            transactional_message_id: None,
            to: None,
            identifiers: None,
            disable_message_retention: false,
            send_to_unsubscribed: true,
            queue_draft: false,
            message_data: None,
            send_at: None,
            language: None,
        }
    }
}

impl SendSmsRequest {
    pub fn new(transactional_message_id: impl ToString) -> Self {
        Self {
            transactional_message_id: Some(transactional_message_id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_identifiers(mut self, identifiers: PersonIdentifier) -> Self {
        self.identifiers = Some(identifiers);
        self
    }

    pub fn with_message_data(mut self, data: Attributes) -> Self {
        self.message_data = Some(data);
        self
    }
}

/// Async client for the App API
#[derive(Debug, Clone)]
pub struct ApiClient {
    session: Arc<ClientSession>,
    auth: Auth,
    prefix: Vec<String>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let session = ClientSession::new(&config.get_base_url(), config.session.clone())?;

        Ok(Self {
            session: Arc::new(session),
            auth: Auth::bearer(config.key.clone()),
            prefix: config.prefix(),
        })
    }

    pub fn from_settings(settings: &CioConfig) -> Result<Self> {
        Self::new(ApiConfig::from_settings(settings)?)
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn close(&self) {
        self.session.close();
    }

    /// Send a transactional email; returns the service's JSON reply
    pub async fn send_email(&self, request: &SendEmailRequest) -> Result<Value> {
        self.post(&["send", "email"], request).await
    }

    pub async fn send_push(&self, request: &SendPushRequest) -> Result<Value> {
        self.post(&["send", "push"], request).await
    }

    pub async fn send_sms(&self, request: &SendSmsRequest) -> Result<Value> {
        self.post(&["send", "sms"], request).await
    }

    async fn post<T: Serialize>(&self, segments: &[&str], payload: &T) -> Result<Value> {
        let path = self
            .prefix
            .iter()
            .cloned()
            .chain(segments.iter().map(|s| s.to_string()));
        let request = RequestDescription::post(path)
            .with_auth(self.auth.clone())
            .with_json(payload)?;

        let response = self.session.send(&request).await?;
        debug!(status = response.status, "Transactional message accepted");

        Ok(response.body.unwrap_or(Value::Null))
    }
}
