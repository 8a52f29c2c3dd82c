use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::LoadError;
use crate::records::{AgentRecord, AgentsFile, ListingRecord, ListingsFile};

pub const AGENTS_FILE: &str = "core-agents.json";
pub const LISTINGS_FILE: &str = "marketplace-listings.json";

/// Reads JSON data files from one fixed directory. Nothing is cached.
#[derive(Debug, Clone)]
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T, LoadError> {
        let path = self.data_dir.join(filename);
        let content = fs::read_to_string(&path).map_err(|source| LoadError::Read {
            filename: filename.to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LoadError::Parse {
            filename: filename.to_string(),
            source,
        })
    }

    pub fn load_agents(&self) -> Result<Vec<AgentRecord>, LoadError> {
        let file: AgentsFile = self.load(AGENTS_FILE)?;
        info!(count = file.agents.len(), file = AGENTS_FILE, "Loaded agents");
        Ok(file.agents)
    }

    pub fn load_listings(&self) -> Result<Vec<ListingRecord>, LoadError> {
        let file: ListingsFile = self.load(LISTINGS_FILE)?;
        info!(count = file.listings.len(), file = LISTINGS_FILE, "Loaded marketplace listings");
        Ok(file.listings)
    }
}
