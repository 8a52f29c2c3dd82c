// crates/jiga-core/src/error.rs

use jiga_store::StoreError;
use thiserror::Error;

use crate::seed::SeedPhase;

/// A data file could not be turned into records.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {filename}: {source}")]
    Read {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {filename}: {source}")]
    Parse {
        filename: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    pub fn filename(&self) -> &str {
        match self {
            LoadError::Read { filename, .. } | LoadError::Parse { filename, .. } => filename,
        }
    }
}

/// A date field that is present but cannot become a timestamp.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Record '{record_id}' has an invalid date at {field} ({value}): {reason}")]
pub struct ConversionError {
    pub record_id: String,
    pub field: String,
    pub value: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum SeedError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("Connection failed: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<StoreError>,
    },

    #[error("Could not stage '{id}' for {collection}: {source}")]
    Staging {
        collection: String,
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Batch commit to {collection} failed: {source}")]
    Commit {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("Reading {collection}/{id} failed: {source}")]
    Lookup {
        collection: String,
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Could not build {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{phase} phase failed: {source}")]
    Phase {
        phase: SeedPhase,
        #[source]
        source: Box<SeedError>,
    },
}

impl SeedError {
    pub fn connection(reason: impl Into<String>) -> Self {
        SeedError::Connection {
            reason: reason.into(),
            source: None,
        }
    }

    /// The innermost seeding error, looking through phase wrappers.
    pub fn root(&self) -> &SeedError {
        match self {
            SeedError::Phase { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SeedError>;
