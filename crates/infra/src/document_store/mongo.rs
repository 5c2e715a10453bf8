//! MongoDB-backed document store.
//!
//! Documents live in `<database>.<collection>` (by default
//! `chimera_flora.floras`) with the upstream service's field names:
//! `flora_id`, `Image`, `Description`, `Origin`, `OtherDetails`.

use async_trait::async_trait;
use mongodb::bson::{Binary, Bson, Document, doc};
use mongodb::error::ErrorKind;
use mongodb::{Client, Collection};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::instrument;

use flora_core::{FloraDocument, FloraId};

use super::{DocumentStore, DocumentStoreError};

/// Raw document shape, as written by the upstream service.
///
/// Every field is required: a document missing one fails to decode rather
/// than being joined with made-up values.
#[derive(Debug, Clone, Deserialize)]
struct FloraDocumentRow {
    flora_id: String,
    #[serde(rename = "Image")]
    image: Binary,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Origin")]
    origin: String,
    #[serde(rename = "OtherDetails")]
    other_details: Document,
}

impl From<FloraDocumentRow> for FloraDocument {
    fn from(row: FloraDocumentRow) -> Self {
        FloraDocument {
            flora_id: row.flora_id,
            image: row.image.bytes,
            description: row.description,
            origin: row.origin,
            attributes: document_to_json(row.other_details),
        }
    }
}

/// Embedded BSON document to an open JSON mapping (relaxed extended JSON).
fn document_to_json(document: Document) -> Map<String, JsonValue> {
    match Bson::Document(document).into_relaxed_extjson() {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

/// MongoDB document store. The driver pools connections internally; the
/// client is cheap to share between concurrent lookups.
#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    client: Client,
    database: String,
    collection: Collection<FloraDocumentRow>,
}

impl MongoDocumentStore {
    pub fn new(client: Client, database: &str, collection: &str) -> Self {
        let collection = client.database(database).collection(collection);
        Self {
            client,
            database: database.to_string(),
            collection,
        }
    }

    /// Build a client for `url`. The driver connects lazily, so an unreachable
    /// server surfaces on the first lookup or ping, not here.
    pub async fn connect(
        url: &str,
        database: &str,
        collection: &str,
    ) -> Result<Self, DocumentStoreError> {
        let client = Client::with_uri_str(url).await.map_err(map_mongo_error)?;
        Ok(Self::new(client, database, collection))
    }

    /// Stop the driver's background workers and close pooled connections.
    pub async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    #[instrument(skip(self), fields(flora_id = %flora_id), err)]
    async fn get_by_foreign_id(
        &self,
        flora_id: &FloraId,
    ) -> Result<Option<FloraDocument>, DocumentStoreError> {
        let row = self
            .collection
            .find_one(doc! { "flora_id": flora_id.to_string() }, None)
            .await
            .map_err(map_mongo_error)?;

        Ok(row.map(FloraDocument::from))
    }

    async fn ping(&self) -> Result<(), DocumentStoreError> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(map_mongo_error)?;
        Ok(())
    }
}

fn map_mongo_error(err: mongodb::error::Error) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::BsonDeserialization(_) => DocumentStoreError::Decode(err.to_string()),
        _ => DocumentStoreError::Unavailable(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::spec::BinarySubtype;
    use serde_json::json;

    #[test]
    fn row_converts_to_domain_document() {
        let raw = doc! {
            "flora_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "Image": Binary { subtype: BinarySubtype::Generic, bytes: vec![9, 8, 7] },
            "Description": "Climbing rose",
            "Origin": "Persia",
            "OtherDetails": { "petals": 5, "fragrant": true, "colors": ["red", "white"] },
        };

        let row: FloraDocumentRow = mongodb::bson::from_document(raw).unwrap();
        let document = FloraDocument::from(row);

        assert_eq!(document.image, vec![9, 8, 7]);
        assert_eq!(document.origin, "Persia");
        assert_eq!(document.attributes["petals"], json!(5));
        assert_eq!(document.attributes["fragrant"], json!(true));
        assert_eq!(document.attributes["colors"], json!(["red", "white"]));
    }

    #[test]
    fn partial_document_does_not_decode() {
        let raw = doc! {
            "flora_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "Image": Binary { subtype: BinarySubtype::Generic, bytes: vec![1] },
        };

        let err = mongodb::bson::from_document::<FloraDocumentRow>(raw).unwrap_err();
        assert!(err.to_string().contains("Description"), "{err}");
    }

    #[test]
    fn decode_failures_map_to_decode_errors() {
        let bson_err = mongodb::bson::from_document::<FloraDocumentRow>(doc! {}).unwrap_err();
        let err = map_mongo_error(ErrorKind::BsonDeserialization(bson_err).into());
        assert!(matches!(err, DocumentStoreError::Decode(_)));
    }
}
