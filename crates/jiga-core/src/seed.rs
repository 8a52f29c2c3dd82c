//! Orchestrates a seeding run: five phases, strictly in order, each one a
//! single atomic batch. A failed phase ends the run; phases committed before
//! it stay committed.

use std::fmt;

use chrono::{DateTime, Utc};
use jiga_store::{DocumentStore, FirestoreStore};
use tracing::{error, info, warn};

use crate::catalog::{self, SystemUser, SYSTEM_USER_ID};
use crate::config::SeedConfig;
use crate::error::{Result, SeedError};
use crate::loader::DataLoader;
use crate::uploader::{BatchUploader, PhaseReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedPhase {
    SystemUser,
    Agents,
    Listings,
    Badges,
    CurrencyPackages,
}

impl SeedPhase {
    /// Execution order. The system user must exist before agents reference it.
    pub const ALL: [SeedPhase; 5] = [
        SeedPhase::SystemUser,
        SeedPhase::Agents,
        SeedPhase::Listings,
        SeedPhase::Badges,
        SeedPhase::CurrencyPackages,
    ];

    pub fn collection(&self) -> &'static str {
        match self {
            SeedPhase::SystemUser => "users",
            SeedPhase::Agents => "agents",
            SeedPhase::Listings => "marketplace",
            SeedPhase::Badges => "badges",
            SeedPhase::CurrencyPackages => "dof_packages",
        }
    }

    pub fn record_noun(&self) -> &'static str {
        match self {
            SeedPhase::SystemUser => "system user",
            SeedPhase::Agents => "agent",
            SeedPhase::Listings => "listing",
            SeedPhase::Badges => "badge",
            SeedPhase::CurrencyPackages => "DOF package",
        }
    }

    fn summary_label(&self) -> &'static str {
        match self {
            SeedPhase::SystemUser => "System user",
            SeedPhase::Agents => "Agents",
            SeedPhase::Listings => "Marketplace listings",
            SeedPhase::Badges => "Badges",
            SeedPhase::CurrencyPackages => "DOF packages",
        }
    }
}

impl fmt::Display for SeedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeedPhase::SystemUser => "system-user",
            SeedPhase::Agents => "agents",
            SeedPhase::Listings => "listings",
            SeedPhase::Badges => "badges",
            SeedPhase::CurrencyPackages => "currency-packages",
        };
        f.write_str(name)
    }
}

/// A `Seeder` only exists once its store session is open, so every run
/// starts from `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedState {
    Connected,
    Running(SeedPhase),
    Done,
    Failed(SeedPhase),
}

/// Per-phase counts of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub reports: Vec<PhaseReport>,
}

impl SeedSummary {
    pub fn count(&self, phase: SeedPhase) -> usize {
        self.reports
            .iter()
            .find(|report| report.phase == phase)
            .map(|report| report.count)
            .unwrap_or(0)
    }
}

impl fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        for report in &self.reports {
            writeln!(f, "  - {}: {}", report.phase.summary_label(), report.count)?;
        }
        Ok(())
    }
}

pub struct Seeder<S: DocumentStore> {
    store: S,
    loader: DataLoader,
    now: DateTime<Utc>,
    state: SeedState,
}

impl Seeder<FirestoreStore> {
    /// Open the store session described by `config`.
    pub async fn connect(config: &SeedConfig) -> Result<Self> {
        let firestore = config.firestore_config()?;
        let project_id = firestore.project_id.clone();
        let store = FirestoreStore::connect(firestore)
            .await
            .map_err(|source| SeedError::Connection {
                reason: format!("could not open a session for project '{project_id}'"),
                source: Some(source),
            })?;
        info!(project_id = %project_id, "Connected to Firestore");
        Ok(Self::new(store, DataLoader::new(config.data_dir.clone())))
    }
}

impl<S: DocumentStore> Seeder<S> {
    /// Wrap an already-open store.
    pub fn new(store: S, loader: DataLoader) -> Self {
        Self {
            store,
            loader,
            now: Utc::now(),
            state: SeedState::Connected,
        }
    }

    /// Fix the time stamped on generated documents.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn state(&self) -> SeedState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&mut self) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        for phase in SeedPhase::ALL {
            self.state = SeedState::Running(phase);
            info!(%phase, collection = phase.collection(), "Starting phase");

            match self.run_phase(phase).await {
                Ok(report) => summary.reports.push(report),
                Err(err) => {
                    self.state = SeedState::Failed(phase);
                    error!(%phase, error = %err, "Seeding failed");
                    if !summary.reports.is_empty() {
                        let committed: Vec<String> = summary
                            .reports
                            .iter()
                            .map(|report| report.phase.to_string())
                            .collect();
                        warn!(
                            committed = ?committed,
                            "Earlier phases remain committed; nothing is rolled back"
                        );
                    }
                    return Err(SeedError::Phase {
                        phase,
                        source: Box::new(err),
                    });
                }
            }
        }

        self.state = SeedState::Done;
        info!("Database seeding completed successfully");
        Ok(summary)
    }

    async fn run_phase(&self, phase: SeedPhase) -> Result<PhaseReport> {
        let uploader = BatchUploader::new(&self.store);
        match phase {
            SeedPhase::SystemUser => {
                uploader
                    .upload(phase, &[SystemUser::new(self.now)])
                    .await
            }
            SeedPhase::Agents => {
                self.ensure_system_user().await?;
                let agents = self.loader.load_agents()?;
                uploader.upload(phase, &agents).await
            }
            SeedPhase::Listings => {
                let listings = self.loader.load_listings()?;
                uploader.upload(phase, &listings).await
            }
            SeedPhase::Badges => uploader.upload(phase, &catalog::badge_definitions()).await,
            SeedPhase::CurrencyPackages => {
                uploader.upload(phase, &catalog::currency_packages()).await
            }
        }
    }

    /// Agents name the system user as their owner; refuse to write them
    /// when that document is missing.
    async fn ensure_system_user(&self) -> Result<()> {
        let collection = SeedPhase::SystemUser.collection();
        let existing = self
            .store
            .get_document(collection, SYSTEM_USER_ID)
            .await
            .map_err(|source| SeedError::Lookup {
                collection: collection.to_string(),
                id: SYSTEM_USER_ID.to_string(),
                source,
            })?;

        match existing {
            Some(_) => Ok(()),
            None => Err(SeedError::Precondition(format!(
                "{collection}/{SYSTEM_USER_ID} must exist before agents are uploaded"
            ))),
        }
    }
}
