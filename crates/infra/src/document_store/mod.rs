//! Document store access (flora details keyed by the relational id).

pub mod in_memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use flora_core::{FloraDocument, FloraId};

pub use in_memory::InMemoryDocumentStore;
pub use mongo::MongoDocumentStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// Transport/connection failure. Distinct from "no such document".
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A document exists but does not have the expected shape.
    #[error("malformed flora document: {0}")]
    Decode(String),
}

/// Lookup of flora documents by foreign identifier.
///
/// `Ok(None)` is a valid answer: documents are linked by value only, so a
/// relational record without a document is an expected state. Callers that
/// need the document to complete a join decide whether absence is an error.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_by_foreign_id(
        &self,
        flora_id: &FloraId,
    ) -> Result<Option<FloraDocument>, DocumentStoreError>;

    /// Cheap round-trip used by the health probe.
    async fn ping(&self) -> Result<(), DocumentStoreError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get_by_foreign_id(
        &self,
        flora_id: &FloraId,
    ) -> Result<Option<FloraDocument>, DocumentStoreError> {
        (**self).get_by_foreign_id(flora_id).await
    }

    async fn ping(&self) -> Result<(), DocumentStoreError> {
        (**self).ping().await
    }
}
