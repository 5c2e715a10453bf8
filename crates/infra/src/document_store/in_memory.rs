use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use flora_core::{FloraDocument, FloraId};

use super::{DocumentStore, DocumentStoreError};

/// In-memory document store for tests/dev, with fault injection.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, FloraDocument>>,
    failing: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = FloraDocument>) -> Self {
        let store = Self::new();
        for document in documents {
            store.insert(document);
        }
        store
    }

    pub fn insert(&self, document: FloraDocument) {
        if let Ok(mut docs) = self.documents.write() {
            docs.insert(document.flora_id.clone(), document);
        }
    }

    /// Make lookups for one foreign id fail with a transport error.
    pub fn fail_lookups_for(&self, flora_id: &FloraId) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(flora_id.to_string());
        }
    }

    /// Make every call fail as if the server were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every lookup, yielding to the runtime like a real round-trip.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DocumentStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Unavailable(
                "server selection timeout".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_by_foreign_id(
        &self,
        flora_id: &FloraId,
    ) -> Result<Option<FloraDocument>, DocumentStoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        self.check_available()?;

        let key = flora_id.to_string();
        let failing = self
            .failing
            .read()
            .map_err(|_| DocumentStoreError::Unavailable("lock poisoned".to_string()))?;
        if failing.contains(&key) {
            return Err(DocumentStoreError::Unavailable(format!(
                "connection reset while reading {key}"
            )));
        }

        let docs = self
            .documents
            .read()
            .map_err(|_| DocumentStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(docs.get(&key).cloned())
    }

    async fn ping(&self) -> Result<(), DocumentStoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn document(id: &FloraId) -> FloraDocument {
        FloraDocument {
            flora_id: id.to_string(),
            image: vec![1, 2, 3],
            description: "d".to_string(),
            origin: "o".to_string(),
            attributes: Map::new(),
        }
    }

    #[tokio::test]
    async fn absence_is_not_an_error() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(store.get_by_foreign_id(&FloraId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn injected_failures_are_transport_errors() {
        let id = FloraId::new();
        let store = InMemoryDocumentStore::with_documents([document(&id)]);
        assert!(store.get_by_foreign_id(&id).await.unwrap().is_some());

        store.fail_lookups_for(&id);
        let err = store.get_by_foreign_id(&id).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::Unavailable(_)));
    }
}
