//! In-process document store.
//!
//! Batches are applied under a single lock, and server timestamps come from
//! the injected clock, so tests can pin `createdAt` values.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::SecondsFormat;
use mockable::Clock;
use serde_json::{Map, Value};

use crate::domain::ports::{
    Document, DocumentPath, DocumentStore, DocumentStoreError, DocumentWrite,
};

type Documents = BTreeMap<DocumentPath, Map<String, Value>>;

#[derive(Default)]
struct StoreState {
    documents: Documents,
    pending_failure: Option<DocumentStoreError>,
}

/// Document store keeping every document in memory.
pub struct InMemoryDocumentStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryDocumentStore {
    /// Create an empty store stamping server timestamps from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// Place a document directly, bypassing batches and timestamps.
    pub fn insert(
        &self,
        path: DocumentPath,
        fields: Map<String, Value>,
    ) -> Result<(), DocumentStoreError> {
        self.lock()?.documents.insert(path, fields);
        Ok(())
    }

    /// Whether a document exists at `path`.
    pub fn contains(&self, path: &DocumentPath) -> Result<bool, DocumentStoreError> {
        Ok(self.lock()?.documents.contains_key(path))
    }

    /// Number of stored documents.
    pub fn len(&self) -> Result<usize, DocumentStoreError> {
        Ok(self.lock()?.documents.len())
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> Result<bool, DocumentStoreError> {
        Ok(self.lock()?.documents.is_empty())
    }

    /// Make the next commit fail with `error` without applying any write.
    pub fn fail_next_commit(&self, error: DocumentStoreError) -> Result<(), DocumentStoreError> {
        self.lock()?.pending_failure = Some(error);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, DocumentStoreError> {
        self.state
            .lock()
            .map_err(|_| DocumentStoreError::query("in-memory document store lock poisoned"))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, DocumentStoreError> {
        let state = self.lock()?;
        Ok(state.documents.get(path).map(|fields| Document {
            path: path.clone(),
            fields: fields.clone(),
        }))
    }

    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), DocumentStoreError> {
        let mut state = self.lock()?;
        if let Some(error) = state.pending_failure.take() {
            return Err(error);
        }

        let commit_time = self.clock.utc().to_rfc3339_opts(SecondsFormat::Micros, true);
        for write in writes {
            let DocumentWrite {
                path,
                mut fields,
                server_timestamps,
            } = write;
            for field in server_timestamps {
                fields.insert(field, Value::String(commit_time.clone()));
            }
            state.documents.insert(path, fields);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{Collection, UserId};
    use crate::test_support::FixedClock;
    use serde_json::json;

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::at(2026, 3, 1, 9, 30, 0))
    }

    fn path(collection: Collection) -> DocumentPath {
        DocumentPath::new(collection, UserId::new("u-1").expect("valid id"))
    }

    #[tokio::test]
    async fn commit_stamps_server_timestamps() {
        let store = InMemoryDocumentStore::new(fixed_clock());
        let mut fields = Map::new();
        fields.insert("email".to_owned(), json!("ada@example.com"));

        store
            .commit(vec![
                DocumentWrite::set(path(Collection::Users), fields).with_server_timestamp("createdAt"),
            ])
            .await
            .expect("commit succeeds");

        let document = store
            .get(&path(Collection::Users))
            .await
            .expect("get succeeds")
            .expect("document exists");
        assert_eq!(
            document.fields.get("createdAt"),
            Some(&json!("2026-03-01T09:30:00.000000Z"))
        );
        assert_eq!(document.fields.get("email"), Some(&json!("ada@example.com")));
    }

    #[tokio::test]
    async fn injected_failure_applies_no_writes() {
        let store = InMemoryDocumentStore::new(fixed_clock());
        store
            .fail_next_commit(DocumentStoreError::connection("offline"))
            .expect("inject failure");

        let err = store
            .commit(vec![
                DocumentWrite::set(path(Collection::Users), Map::new()),
                DocumentWrite::set(path(Collection::Patients), Map::new()),
            ])
            .await
            .expect_err("commit must fail");

        assert_eq!(err, DocumentStoreError::connection("offline"));
        assert!(store.is_empty().expect("len"));
    }

    #[tokio::test]
    async fn missing_documents_read_as_none() {
        let store = InMemoryDocumentStore::new(fixed_clock());
        let fetched = store.get(&path(Collection::Caretakers)).await.expect("get");
        assert!(fetched.is_none());
    }
}
