//! Track API v2: the `/entity` and `/batch` endpoints
//!
//! The service decides what to do from the `type` and `action` keys of each
//! payload. People and objects are the two entity types. Obtained through
//! [`TrackClient::v2`], so the session and credentials are shared with v1.

use crate::error::{Error, Result};
use crate::identifiers::{Identifiers, ObjectIdentifier, PersonIdentifier, Relationship};
use crate::payload::{sanitize, Attributes};
use crate::request::RequestDescription;
use crate::track::{require, TrackClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Largest accepted `/batch` request body
pub const MAX_BATCH_BYTES: usize = 500 * 1024;

/// Largest accepted single item inside a batch
pub const MAX_BATCH_ITEM_BYTES: usize = 32 * 1024;

/// Operation performed on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Identify,
    Delete,
    Event,
    Screen,
    Page,
    AddRelationships,
    DeleteRelationships,
    AddDevice,
    DeleteDevice,
    Merge,
    Suppress,
    Unsuppress,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Identify => "identify",
            Action::Delete => "delete",
            Action::Event => "event",
            Action::Screen => "screen",
            Action::Page => "page",
            Action::AddRelationships => "add_relationships",
            Action::DeleteRelationships => "delete_relationships",
            Action::AddDevice => "add_device",
            Action::DeleteDevice => "delete_device",
            Action::Merge => "merge",
            Action::Suppress => "suppress",
            Action::Unsuppress => "unsuppress",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Object,
}

/// One v2 entity operation; also the item type of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPayload {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub action: Action,
    pub identifiers: Identifiers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cio_relationships: Option<Vec<Relationship>>,
}

impl EntityPayload {
    pub fn person(action: Action, identifiers: PersonIdentifier) -> Self {
        Self::new(EntityType::Person, action, identifiers.into())
    }

    pub fn object(action: Action, identifiers: ObjectIdentifier) -> Self {
        Self::new(EntityType::Object, action, identifiers.into())
    }

    fn new(entity_type: EntityType, action: Action, identifiers: Identifiers) -> Self {
        Self {
            entity_type,
            action,
            identifiers,
            attributes: None,
            name: None,
            device: None,
            cio_relationships: None,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_device(mut self, device: Attributes) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_relationships(mut self, relationships: Vec<Relationship>) -> Self {
        self.cio_relationships = Some(relationships);
        self
    }
}

/// Track API v2 operations
#[derive(Debug, Clone, Copy)]
pub struct TrackV2<'a> {
    client: &'a TrackClient,
}

impl<'a> TrackV2<'a> {
    pub(crate) fn new(client: &'a TrackClient) -> Self {
        Self { client }
    }

    /// POST a fully formed payload to `/api/v2/entity`
    pub async fn send_entity<T>(&self, payload: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let request =
            RequestDescription::post(self.client.v2_path(&["entity"])).with_json(payload)?;
        self.client.execute(request).await
    }

    /// Send several operations in one request.
    ///
    /// Items may mix people and objects. The whole request must stay under
    /// [`MAX_BATCH_BYTES`] and each item under [`MAX_BATCH_ITEM_BYTES`]; both
    /// limits are checked before anything is sent.
    pub async fn send_batch(&self, batch: &[EntityPayload]) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::InvalidArgument("batch cannot be empty".to_string()));
        }

        for (index, item) in batch.iter().enumerate() {
            let size = serde_json::to_vec(item)?.len();
            if size > MAX_BATCH_ITEM_BYTES {
                return Err(Error::InvalidArgument(format!(
                    "batch item {} is {} bytes, limit is {}",
                    index, size, MAX_BATCH_ITEM_BYTES
                )));
            }
        }

        let body = json!({ "batch": batch });
        let size = serde_json::to_vec(&body)?.len();
        if size > MAX_BATCH_BYTES {
            return Err(Error::InvalidArgument(format!(
                "batch is {} bytes, limit is {}",
                size, MAX_BATCH_BYTES
            )));
        }

        debug!(items = batch.len(), bytes = size, "Sending v2 batch");

        let request = RequestDescription::post(self.client.v2_path(&["batch"])).with_body(body);
        self.client.execute(request).await
    }

    // Person operations

    /// Create or update a person
    pub async fn identify_person<T>(&self, identifiers: &PersonIdentifier, attributes: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        person_required(identifiers, "identify_person")?;

        let payload = EntityPayload::person(Action::Identify, identifiers.clone())
            .with_attributes(sanitize(attributes)?);
        self.send_entity(&payload).await
    }

    pub async fn delete_person(&self, identifiers: &PersonIdentifier) -> Result<()> {
        person_required(identifiers, "delete_person")?;

        self.send_entity(&EntityPayload::person(Action::Delete, identifiers.clone()))
            .await
    }

    pub async fn track_person_event<T>(
        &self,
        identifiers: &PersonIdentifier,
        name: &str,
        attributes: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        person_required(identifiers, "track_person_event")?;
        require("name", name, "track_person_event")?;

        let payload = EntityPayload::person(Action::Event, identifiers.clone())
            .with_name(name)
            .with_attributes(sanitize(attributes)?);
        self.send_entity(&payload).await
    }

    /// Page view; `name` is the page URL
    pub async fn person_pageview<T>(
        &self,
        identifiers: &PersonIdentifier,
        name: &str,
        attributes: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        person_required(identifiers, "person_pageview")?;
        require("name", name, "person_pageview")?;

        let payload = EntityPayload::person(Action::Page, identifiers.clone())
            .with_name(name)
            .with_attributes(sanitize(attributes)?);
        self.send_entity(&payload).await
    }

    /// Mobile screen view
    pub async fn person_screen<T>(
        &self,
        identifiers: &PersonIdentifier,
        name: &str,
        attributes: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        person_required(identifiers, "person_screen")?;
        require("name", name, "person_screen")?;

        let payload = EntityPayload::person(Action::Screen, identifiers.clone())
            .with_name(name)
            .with_attributes(sanitize(attributes)?);
        self.send_entity(&payload).await
    }

    pub async fn add_person_device<T>(
        &self,
        identifiers: &PersonIdentifier,
        device_id: &str,
        platform: &str,
        device_attributes: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        person_required(identifiers, "add_person_device")?;
        require("device_id", device_id, "add_person_device")?;
        require("platform", platform, "add_person_device")?;

        let mut device = Attributes::new();
        device.insert("id".to_string(), Value::from(device_id));
        device.insert("platform".to_string(), Value::from(platform));
        device.extend(sanitize(device_attributes)?);

        let payload =
            EntityPayload::person(Action::AddDevice, identifiers.clone()).with_device(device);
        self.send_entity(&payload).await
    }

    pub async fn delete_person_device(&self, identifiers: &PersonIdentifier, device_id: &str) -> Result<()> {
        person_required(identifiers, "delete_person_device")?;
        require("device_id", device_id, "delete_person_device")?;

        let mut device = Attributes::new();
        device.insert("id".to_string(), Value::from(device_id));

        let payload =
            EntityPayload::person(Action::DeleteDevice, identifiers.clone()).with_device(device);
        self.send_entity(&payload).await
    }

    pub async fn suppress_person(&self, identifiers: &PersonIdentifier) -> Result<()> {
        person_required(identifiers, "suppress_person")?;

        self.send_entity(&EntityPayload::person(Action::Suppress, identifiers.clone()))
            .await
    }

    pub async fn unsuppress_person(&self, identifiers: &PersonIdentifier) -> Result<()> {
        person_required(identifiers, "unsuppress_person")?;

        self.send_entity(&EntityPayload::person(Action::Unsuppress, identifiers.clone()))
            .await
    }

    /// Merge `secondary` into `primary`. Not reversible.
    pub async fn merge_persons(&self, primary: &PersonIdentifier, secondary: &PersonIdentifier) -> Result<()> {
        if primary.is_blank() {
            return Err(Error::InvalidArgument(
                "primary identifiers cannot be blank in merge_persons".to_string(),
            ));
        }
        if secondary.is_blank() {
            return Err(Error::InvalidArgument(
                "secondary identifiers cannot be blank in merge_persons".to_string(),
            ));
        }

        let payload = EntityPayload::person(Action::Merge, primary.clone())
            .with_relationships(vec![Relationship::new(secondary.clone())]);
        self.send_entity(&payload).await
    }

    /// Relate a person to one or more objects
    pub async fn add_person_relationships(
        &self,
        identifiers: &PersonIdentifier,
        relationships: Vec<Relationship>,
    ) -> Result<()> {
        person_required(identifiers, "add_person_relationships")?;
        relationships_required(&relationships, "add_person_relationships")?;

        let payload = EntityPayload::person(Action::AddRelationships, identifiers.clone())
            .with_relationships(relationships);
        self.send_entity(&payload).await
    }

    pub async fn delete_person_relationships(
        &self,
        identifiers: &PersonIdentifier,
        relationships: Vec<Relationship>,
    ) -> Result<()> {
        person_required(identifiers, "delete_person_relationships")?;
        relationships_required(&relationships, "delete_person_relationships")?;

        let payload = EntityPayload::person(Action::DeleteRelationships, identifiers.clone())
            .with_relationships(relationships);
        self.send_entity(&payload).await
    }

    // Object operations

    /// Create or update an object
    pub async fn identify_object<T>(&self, identifiers: &ObjectIdentifier, attributes: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        object_required(identifiers, "identify_object")?;

        let payload = EntityPayload::object(Action::Identify, identifiers.clone())
            .with_attributes(sanitize(attributes)?);
        self.send_entity(&payload).await
    }

    pub async fn delete_object(&self, identifiers: &ObjectIdentifier) -> Result<()> {
        object_required(identifiers, "delete_object")?;

        self.send_entity(&EntityPayload::object(Action::Delete, identifiers.clone()))
            .await
    }

    pub async fn track_object_event<T>(
        &self,
        identifiers: &ObjectIdentifier,
        name: &str,
        attributes: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        object_required(identifiers, "track_object_event")?;
        require("name", name, "track_object_event")?;

        let payload = EntityPayload::object(Action::Event, identifiers.clone())
            .with_name(name)
            .with_attributes(sanitize(attributes)?);
        self.send_entity(&payload).await
    }

    /// Relate an object to one or more people
    pub async fn add_object_relationships(
        &self,
        identifiers: &ObjectIdentifier,
        relationships: Vec<Relationship>,
    ) -> Result<()> {
        object_required(identifiers, "add_object_relationships")?;
        relationships_required(&relationships, "add_object_relationships")?;

        let payload = EntityPayload::object(Action::AddRelationships, identifiers.clone())
            .with_relationships(relationships);
        self.send_entity(&payload).await
    }

    pub async fn delete_object_relationships(
        &self,
        identifiers: &ObjectIdentifier,
        relationships: Vec<Relationship>,
    ) -> Result<()> {
        object_required(identifiers, "delete_object_relationships")?;
        relationships_required(&relationships, "delete_object_relationships")?;

        let payload = EntityPayload::object(Action::DeleteRelationships, identifiers.clone())
            .with_relationships(relationships);
        self.send_entity(&payload).await
    }
}

fn person_required(identifiers: &PersonIdentifier, operation: &str) -> Result<()> {
    require("identifiers", identifiers.value(), operation)
}

fn object_required(identifiers: &ObjectIdentifier, operation: &str) -> Result<()> {
    if identifiers.is_blank() {
        return Err(Error::InvalidArgument(format!(
            "identifiers cannot be blank in {}",
            operation
        )));
    }
    Ok(())
}

fn relationships_required(relationships: &[Relationship], operation: &str) -> Result<()> {
    if relationships.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "relationships cannot be blank in {}",
            operation
        )));
    }
    if relationships.iter().any(|r| r.identifiers.is_blank()) {
        return Err(Error::InvalidArgument(format!(
            "relationship identifiers cannot be blank in {}",
            operation
        )));
    }
    Ok(())
}
