//! Document-store abstractions used by the JIGA seeding tools.
//!
//! A [`DocumentStore`] applies a set of staged full-document writes as one
//! atomic commit. [`FirestoreStore`] talks to the hosted service (or a local
//! emulator) over REST; [`MemoryStore`] keeps everything in process.

mod batch;
mod error;
pub mod firestore;
mod memory;
mod value;

pub use batch::{validate_document_id, DocumentWrite, WriteBatch, MAX_BATCH_WRITES};
pub use error::StoreError;
pub use firestore::{FirestoreConfig, FirestoreEndpoint, FirestoreStore, ServiceAccountKey};
pub use memory::MemoryStore;
pub use value::{Document, FieldValue};

use async_trait::async_trait;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Apply every write or none of them.
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError>;

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError>;
}
