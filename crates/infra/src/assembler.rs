//! Entity assembly: relational record + document → unified [`Flora`].
//!
//! The join is fail-loud:
//!
//! | document lookup | outcome |
//! |-----------------|---------|
//! | found | `Flora` |
//! | transport error | `StoreUnavailable` (500) |
//! | not found | `JoinFailure` (500) |
//!
//! A missing document is treated like a failed lookup rather than degrading to
//! a partial entity. No entity is ever built from half of the data.

use futures::{StreamExt, TryStreamExt, stream};
use tracing::warn;

use flora_core::{DomainError, DomainResult, Entity, Flora, FloraRecord};

use crate::document_store::DocumentStore;

/// Upper bound on document lookups in flight for one batch.
const JOIN_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct EntityAssembler<D> {
    documents: D,
}

impl<D> EntityAssembler<D> {
    pub fn new(documents: D) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }
}

impl<D> EntityAssembler<D>
where
    D: DocumentStore,
{
    /// Join one record with its document.
    pub async fn assemble(&self, record: FloraRecord) -> DomainResult<Flora> {
        let flora_id = *record.id();

        let document = self
            .documents
            .get_by_foreign_id(&flora_id)
            .await
            .map_err(|e| {
                warn!(%flora_id, error = %e, "document lookup failed");
                DomainError::store_unavailable(format!(
                    "An error occurred when retrieving Mongo data: {e}"
                ))
            })?
            .ok_or_else(|| {
                warn!(%flora_id, "relational record has no document");
                DomainError::join_failure(format!("Flora details not found for {flora_id}"))
            })?;

        Flora::join(record, document)
    }

    /// Join every record, preserving input order.
    ///
    /// Fail-fast: the first failed join fails the whole batch and no partial
    /// list is returned. Lookups run with bounded concurrency.
    pub async fn assemble_many(&self, records: Vec<FloraRecord>) -> DomainResult<Vec<Flora>> {
        stream::iter(records)
            .map(|record| self.assemble(record))
            .buffered(JOIN_CONCURRENCY)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flora_core::{FloraDocument, FloraId, OwnerId, Visibility};
    use serde_json::Map;

    use crate::document_store::InMemoryDocumentStore;

    fn record() -> FloraRecord {
        FloraRecord {
            id: FloraId::new(),
            owner_id: OwnerId::new("owner"),
            common_name: "Fern".to_string(),
            scientific_name: "Polypodiopsida".to_string(),
            visibility: Visibility::Public,
        }
    }

    fn document_for(record: &FloraRecord) -> FloraDocument {
        FloraDocument {
            flora_id: record.id.to_string(),
            image: vec![0u8; 4],
            description: "Shade plant".to_string(),
            origin: "Everywhere".to_string(),
            attributes: Map::new(),
        }
    }

    #[tokio::test]
    async fn assembles_when_document_present() {
        let r = record();
        let assembler = EntityAssembler::new(InMemoryDocumentStore::with_documents([document_for(&r)]));

        let flora = assembler.assemble(r.clone()).await.unwrap();
        assert_eq!(flora.id, r.id);
        assert_eq!(flora.description, "Shade plant");
    }

    #[tokio::test]
    async fn missing_document_is_a_join_failure() {
        let assembler = EntityAssembler::new(InMemoryDocumentStore::new());
        let r = record();

        let err = assembler.assemble(r.clone()).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::join_failure(format!("Flora details not found for {}", r.id))
        );
        assert_eq!(err.code(), 500);
    }

    #[tokio::test]
    async fn lookup_error_is_store_unavailable() {
        let r = record();
        let docs = InMemoryDocumentStore::with_documents([document_for(&r)]);
        docs.fail_lookups_for(&r.id);

        let err = EntityAssembler::new(docs).assemble(r).await.unwrap_err();
        assert!(matches!(err, DomainError::StoreUnavailable(ref m) if m.starts_with("An error occurred when retrieving Mongo data")));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let records: Vec<_> = (0..20).map(|_| record()).collect();
        let docs = InMemoryDocumentStore::with_documents(records.iter().map(document_for));

        let floras = EntityAssembler::new(docs).assemble_many(records.clone()).await.unwrap();
        let ids: Vec<_> = floras.iter().map(|f| f.id).collect();
        let expected: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn batch_fails_fast_on_one_broken_join() {
        let records: Vec<_> = (0..5).map(|_| record()).collect();
        let docs = InMemoryDocumentStore::with_documents(records.iter().map(document_for));
        docs.fail_lookups_for(&records[3].id);

        let err = EntityAssembler::new(docs).assemble_many(records).await.unwrap_err();
        assert_eq!(err.code(), 500);
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let floras = EntityAssembler::new(InMemoryDocumentStore::new())
            .assemble_many(vec![])
            .await
            .unwrap();
        assert!(floras.is_empty());
    }
}
