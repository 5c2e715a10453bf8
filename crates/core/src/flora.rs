//! Flora records as they live in each store, and the joined entity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{FloraId, OwnerId};

/// Categorical visibility tag of a flora record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl core::str::FromStr for Visibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(DomainError::invalid_argument(format!(
                "unknown visibility '{other}'"
            ))),
        }
    }
}

/// Row of the relational store. Read-only from this service's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloraRecord {
    pub id: FloraId,
    pub owner_id: OwnerId,
    pub common_name: String,
    pub scientific_name: String,
    pub visibility: Visibility,
}

impl Entity for FloraRecord {
    type Id = FloraId;

    fn id(&self) -> &FloraId {
        &self.id
    }
}

/// Document of the document store, keyed by the relational id *by value*.
///
/// `flora_id` is a plain string: the document store enforces no referential
/// integrity, so nothing guarantees it names an existing relational record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloraDocument {
    pub flora_id: String,
    /// Opaque image bytes; never decoded here.
    pub image: Vec<u8>,
    pub description: String,
    pub origin: String,
    pub attributes: Map<String, JsonValue>,
}

impl Entity for FloraDocument {
    type Id = String;

    fn id(&self) -> &String {
        &self.flora_id
    }
}

/// Unified entity: one relational record joined with its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flora {
    pub id: FloraId,
    pub user_id: OwnerId,
    pub common_name: String,
    pub scientific_name: String,
    #[serde(rename = "type")]
    pub visibility: Visibility,
    #[serde(with = "base64_bytes")]
    pub image: Vec<u8>,
    pub description: String,
    pub origin: String,
    pub other_details: Map<String, JsonValue>,
}

impl Flora {
    /// Merge a relational record with the document stored under its id.
    ///
    /// Fails with `JoinFailure` if the document belongs to another record.
    pub fn join(record: FloraRecord, document: FloraDocument) -> DomainResult<Self> {
        if document.flora_id != record.id.to_string() {
            return Err(DomainError::join_failure(format!(
                "document {} does not belong to flora {}",
                document.flora_id, record.id
            )));
        }

        Ok(Self {
            id: record.id,
            user_id: record.owner_id,
            common_name: record.common_name,
            scientific_name: record.scientific_name,
            visibility: record.visibility,
            image: document.image,
            description: document.description,
            origin: document.origin,
            other_details: document.attributes,
        })
    }
}

impl Entity for Flora {
    type Id = FloraId;

    fn id(&self) -> &FloraId {
        &self.id
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
