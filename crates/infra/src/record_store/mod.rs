//! Relational store access (flora rows).

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use flora_core::{DomainError, FloraId, FloraRecord};

pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordStoreError {
    /// The store could not be reached or the query failed in transport.
    #[error("relational store unavailable: {0}")]
    Unavailable(String),

    /// A row came back in a shape that does not map onto a record.
    #[error("malformed flora row: {0}")]
    Decode(String),
}

impl From<RecordStoreError> for DomainError {
    fn from(value: RecordStoreError) -> Self {
        DomainError::store_unavailable(format!("An error occurred: {value}"))
    }
}

/// Read-only access to flora records.
///
/// Each call acquires its own session (a pooled connection for Postgres) and
/// releases it before returning; no call holds a session beyond its own
/// duration. Identifiers are typed, so malformed ids are rejected while
/// decoding the request and never reach the store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records, in storage order. An empty store is an empty vec.
    async fn list_all(&self) -> Result<Vec<FloraRecord>, RecordStoreError>;

    /// Lookup by primary key. `Ok(None)` means no such record.
    async fn get_by_id(&self, id: FloraId) -> Result<Option<FloraRecord>, RecordStoreError>;

    /// Cheap round-trip used by the health probe.
    async fn ping(&self) -> Result<(), RecordStoreError>;
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn list_all(&self) -> Result<Vec<FloraRecord>, RecordStoreError> {
        (**self).list_all().await
    }

    async fn get_by_id(&self, id: FloraId) -> Result<Option<FloraRecord>, RecordStoreError> {
        (**self).get_by_id(id).await
    }

    async fn ping(&self) -> Result<(), RecordStoreError> {
        (**self).ping().await
    }
}
