use std::fmt;

use jiga_store::{Document, DocumentStore, WriteBatch};
use tracing::info;

use crate::catalog::{Badge, CurrencyPackage, SystemUser};
use crate::error::{Result, SeedError};
use crate::records::{AgentRecord, ListingRecord};
use crate::seed::SeedPhase;
use crate::timestamps::{self, AGENT_TIMESTAMP_PATHS, LISTING_TIMESTAMP_PATHS};

/// Anything that can be written as one document of a seeding phase.
pub trait SeedRecord {
    fn document_id(&self) -> &str;

    /// How the record is named in progress output.
    fn label(&self) -> String;

    /// The document to store, with every date already converted.
    fn to_document(&self) -> Result<Document>;
}

impl SeedRecord for AgentRecord {
    fn document_id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }

    fn to_document(&self) -> Result<Document> {
        Ok(timestamps::normalize(
            &self.id,
            self.raw_document(),
            AGENT_TIMESTAMP_PATHS,
        )?)
    }
}

impl SeedRecord for ListingRecord {
    fn document_id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn to_document(&self) -> Result<Document> {
        Ok(timestamps::normalize(
            &self.id,
            self.raw_document(),
            LISTING_TIMESTAMP_PATHS,
        )?)
    }
}

impl SeedRecord for SystemUser {
    fn document_id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.display_name.clone()
    }

    fn to_document(&self) -> Result<Document> {
        SystemUser::to_document(self)
    }
}

impl SeedRecord for Badge {
    fn document_id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn to_document(&self) -> Result<Document> {
        Badge::to_document(self)
    }
}

impl SeedRecord for CurrencyPackage {
    fn document_id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn to_document(&self) -> Result<Document> {
        CurrencyPackage::to_document(self)
    }
}

/// Outcome of one committed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: SeedPhase,
    pub count: usize,
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            SeedPhase::SystemUser => write!(f, "Successfully created system user"),
            SeedPhase::Agents => write!(f, "Successfully uploaded {} agents", self.count),
            SeedPhase::Listings => write!(
                f,
                "Successfully uploaded {} marketplace listings",
                self.count
            ),
            SeedPhase::Badges => write!(
                f,
                "Successfully created {} badge definitions",
                self.count
            ),
            SeedPhase::CurrencyPackages => {
                write!(f, "Successfully created {} DOF packages", self.count)
            }
        }
    }
}

/// Stages one phase's records into a single batch and commits it once.
pub struct BatchUploader<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> BatchUploader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn upload<R: SeedRecord>(
        &self,
        phase: SeedPhase,
        records: &[R],
    ) -> Result<PhaseReport> {
        let collection = phase.collection();

        // All documents are built before the first write is staged.
        let documents = records
            .iter()
            .map(|record| record.to_document().map(|doc| (record, doc)))
            .collect::<Result<Vec<_>>>()?;

        let mut batch = WriteBatch::new();
        for (record, document) in documents {
            let id = record.document_id();
            batch
                .set(collection, id, document)
                .map_err(|source| SeedError::Staging {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    source,
                })?;
            info!(collection, id, "Prepared {}: {}", phase.record_noun(), record.label());
        }

        let count = batch
            .commit(self.store)
            .await
            .map_err(|source| SeedError::Commit {
                collection: collection.to_string(),
                source,
            })?;

        let report = PhaseReport { phase, count };
        info!(collection, count, "{report}");
        Ok(report)
    }
}
