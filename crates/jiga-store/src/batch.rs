use tracing::debug;

use crate::{Document, DocumentStore, StoreError};

/// Per-commit write limit of the hosted store.
pub const MAX_BATCH_WRITES: usize = 500;

const MAX_DOCUMENT_ID_BYTES: usize = 1500;

/// A full-document upsert: the stored document is replaced, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub collection: String,
    pub id: String,
    pub fields: Document,
}

/// Writes staged in memory until a single [`WriteBatch::commit`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<DocumentWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a write. Ids are checked here so a bad key never reaches the store.
    pub fn set(
        &mut self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<&mut Self, StoreError> {
        validate_document_id(collection)?;
        validate_document_id(id)?;
        if self.writes.len() >= MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                max: MAX_BATCH_WRITES,
            });
        }
        self.writes.push(DocumentWrite {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        Ok(self)
    }

    pub(crate) fn len(&self) -> usize {
        self.writes.len()
    }

    /// Hand every staged write to the store in one call.
    pub async fn commit<S>(self, store: &S) -> Result<usize, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        let count = self.len();
        debug!(count, "Committing write batch");
        store.commit(self.writes).await?;
        Ok(count)
    }
}

pub fn validate_document_id(id: &str) -> Result<(), StoreError> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains('/')
        || id.len() > MAX_DOCUMENT_ID_BYTES;
    if invalid {
        return Err(StoreError::InvalidDocumentId(id.to_string()));
    }
    Ok(())
}
