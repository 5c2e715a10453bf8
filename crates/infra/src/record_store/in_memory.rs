use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use flora_core::{Entity, FloraId, FloraRecord};

use super::{RecordStore, RecordStoreError};

/// In-memory record store for tests/dev.
///
/// Keeps insertion order, like a heap table without an `ORDER BY`.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    rows: RwLock<Vec<FloraRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = FloraRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace a record (keyed by id).
    pub fn insert(&self, record: FloraRecord) {
        if let Ok(mut rows) = self.rows.write() {
            match rows.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record,
                None => rows.push(record),
            }
        }
    }

    /// Make every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RecordStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_all(&self) -> Result<Vec<FloraRecord>, RecordStoreError> {
        self.check_available()?;
        let rows = self
            .rows
            .read()
            .map_err(|_| RecordStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(rows.clone())
    }

    async fn get_by_id(&self, id: FloraId) -> Result<Option<FloraRecord>, RecordStoreError> {
        self.check_available()?;
        let rows = self
            .rows
            .read()
            .map_err(|_| RecordStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(rows.iter().find(|r| r.id() == &id).cloned())
    }

    async fn ping(&self) -> Result<(), RecordStoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flora_core::{OwnerId, Visibility};

    fn record(name: &str) -> FloraRecord {
        FloraRecord {
            id: FloraId::new(),
            owner_id: OwnerId::new("owner"),
            common_name: name.to_string(),
            scientific_name: format!("{name} sp."),
            visibility: Visibility::Private,
        }
    }

    #[tokio::test]
    async fn lists_in_insertion_order() {
        let (a, b) = (record("a"), record("b"));
        let store = InMemoryRecordStore::with_records([a.clone(), b.clone()]);
        assert_eq!(store.list_all().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn get_by_id_distinguishes_missing() {
        let a = record("a");
        let store = InMemoryRecordStore::with_records([a.clone()]);
        assert_eq!(store.get_by_id(a.id).await.unwrap(), Some(a));
        assert_eq!(store.get_by_id(FloraId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unavailable_fails_every_call() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true);
        assert!(store.list_all().await.is_err());
        assert!(store.ping().await.is_err());
    }
}
