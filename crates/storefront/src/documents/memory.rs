//! In-memory document store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use corewell_core::DocumentId;

use super::{Document, DocumentStore, StoreError, StoreResult, prepare_create};

/// One successful write or create, in the order the store accepted them.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub collection: String,
    pub id: DocumentId,
    pub document: Document,
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<(String, DocumentId), Document>,
    log: Vec<WriteRecord>,
    failing_writes: usize,
    offline: bool,
}

/// Document store held in process memory.
///
/// Besides backing tests, it can simulate an unreachable backend:
/// [`fail_next_writes`](Self::fail_next_writes) rejects a number of upcoming
/// writes and [`set_offline`](Self::set_offline) rejects everything.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject the next `count` writes/creates with `StoreError::Unavailable`.
    pub fn fail_next_writes(&self, count: usize) {
        self.inner().failing_writes = count;
    }

    /// Reject every operation while `offline` is set.
    pub fn set_offline(&self, offline: bool) {
        self.inner().offline = offline;
    }

    /// Every accepted write and create, oldest first.
    #[must_use]
    pub fn write_log(&self) -> Vec<WriteRecord> {
        self.inner().log.clone()
    }

    /// Current content of a document, bypassing failure simulation.
    #[must_use]
    pub fn get(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        self.inner()
            .documents
            .get(&(collection.to_owned(), id.clone()))
            .cloned()
    }

    /// All documents in a collection, in no particular order.
    #[must_use]
    pub fn collection(&self, collection: &str) -> Vec<(DocumentId, Document)> {
        self.inner()
            .documents
            .iter()
            .filter(|((name, _), _)| name == collection)
            .map(|((_, id), document)| (id.clone(), document.clone()))
            .collect()
    }

    fn store(&self, collection: &str, id: DocumentId, document: Document) -> StoreResult<()> {
        let mut inner = self.inner();
        if inner.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            return Err(StoreError::Unavailable("simulated write failure".to_string()));
        }
        inner.log.push(WriteRecord {
            collection: collection.to_owned(),
            id: id.clone(),
            document: document.clone(),
        });
        inner.documents.insert((collection.to_owned(), id), document);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        let inner = self.inner();
        if inner.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(inner
            .documents
            .get(&(collection.to_owned(), id.clone()))
            .cloned())
    }

    async fn write(
        &self,
        collection: &str,
        id: &DocumentId,
        document: Document,
    ) -> StoreResult<()> {
        self.store(collection, id.clone(), document)
    }

    async fn create(&self, collection: &str, document: Document) -> StoreResult<DocumentId> {
        let (id, document) = prepare_create(document);
        self.store(collection, id.clone(), document)?;
        Ok(id)
    }
}
