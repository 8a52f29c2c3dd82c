use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Document, DocumentStore, DocumentWrite, StoreError};

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// In-process store with the same all-or-nothing commit semantics as the
/// hosted one. Used for dry runs and as the fake store in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    reject_with: Mutex<Option<String>>,
    last_attempt: Mutex<Vec<DocumentWrite>>,
    commit_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail with `message` without applying anything.
    pub fn reject_commits(&self, message: impl Into<String>) {
        *lock(&self.reject_with) = Some(message.into());
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    /// Writes handed to the most recent commit call, whether or not it succeeded.
    pub fn last_attempted_writes(&self) -> Vec<DocumentWrite> {
        lock(&self.last_attempt).clone()
    }

    /// Insert a document directly, bypassing batches.
    pub fn insert(&self, collection: &str, id: &str, document: Document) {
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    pub fn collection_len(&self, collection: &str) -> usize {
        lock(&self.collections)
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub fn document_ids(&self, collection: &str) -> Vec<String> {
        lock(&self.collections)
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_attempt) = writes.clone();

        if let Some(message) = lock(&self.reject_with).clone() {
            return Err(StoreError::Rejected {
                status: 503,
                message,
            });
        }

        let mut collections = lock(&self.collections);
        for write in writes {
            collections
                .entry(write.collection)
                .or_default()
                .insert(write.id, write.fields);
        }
        Ok(())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        Ok(lock(&self.collections)
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
