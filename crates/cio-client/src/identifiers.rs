//! Identifiers for people and objects

use crate::payload::Attributes;
use serde::{Deserialize, Serialize};

/// Identifies a person. Serializes as `{"id": ..}`, `{"email": ..}` or `{"cio_id": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonIdentifier {
    Id(String),
    Email(String),
    CioId(String),
}

impl PersonIdentifier {
    pub fn id(id: impl ToString) -> Self {
        PersonIdentifier::Id(id.to_string())
    }

    pub fn email(email: impl Into<String>) -> Self {
        PersonIdentifier::Email(email.into())
    }

    pub fn cio_id(cio_id: impl ToString) -> Self {
        PersonIdentifier::CioId(cio_id.to_string())
    }

    /// Key used in the JSON object
    pub fn kind(&self) -> &'static str {
        match self {
            PersonIdentifier::Id(_) => "id",
            PersonIdentifier::Email(_) => "email",
            PersonIdentifier::CioId(_) => "cio_id",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            PersonIdentifier::Id(v) | PersonIdentifier::Email(v) | PersonIdentifier::CioId(v) => v,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value().trim().is_empty()
    }
}

/// Identifies an object (account, course, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectIdentifier {
    Typed {
        object_type_id: String,
        object_id: String,
    },
    Cio {
        cio_object_id: String,
    },
}

impl ObjectIdentifier {
    pub fn new(object_type_id: impl ToString, object_id: impl ToString) -> Self {
        ObjectIdentifier::Typed {
            object_type_id: object_type_id.to_string(),
            object_id: object_id.to_string(),
        }
    }

    pub fn cio(cio_object_id: impl Into<String>) -> Self {
        ObjectIdentifier::Cio {
            cio_object_id: cio_object_id.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            ObjectIdentifier::Typed {
                object_type_id,
                object_id,
            } => object_type_id.trim().is_empty() || object_id.trim().is_empty(),
            ObjectIdentifier::Cio { cio_object_id } => cio_object_id.trim().is_empty(),
        }
    }
}

/// Either kind of identifier, as used in v2 payloads and relationships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifiers {
    Person(PersonIdentifier),
    Object(ObjectIdentifier),
}

impl Identifiers {
    pub fn is_blank(&self) -> bool {
        match self {
            Identifiers::Person(p) => p.is_blank(),
            Identifiers::Object(o) => o.is_blank(),
        }
    }
}

impl From<PersonIdentifier> for Identifiers {
    fn from(p: PersonIdentifier) -> Self {
        Identifiers::Person(p)
    }
}

impl From<ObjectIdentifier> for Identifiers {
    fn from(o: ObjectIdentifier) -> Self {
        Identifiers::Object(o)
    }
}

/// Link between a person and an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub identifiers: Identifiers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_attributes: Option<Attributes>,
}

impl Relationship {
    pub fn new(identifiers: impl Into<Identifiers>) -> Self {
        Self {
            identifiers: identifiers.into(),
            relationship_attributes: None,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.relationship_attributes = Some(attributes);
        self
    }
}
