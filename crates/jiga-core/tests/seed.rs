use std::fs;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use jiga_core::catalog::SYSTEM_USER_ID;
use jiga_core::error::SeedError;
use jiga_core::loader::{DataLoader, AGENTS_FILE, LISTINGS_FILE};
use jiga_core::seed::{SeedPhase, SeedState, Seeder};
use jiga_store::{Document, DocumentStore, DocumentWrite, FieldValue, MemoryStore, StoreError};
use serde_json::json;

fn write_data(dir: &Path, agents: usize, listings: usize) {
    let agents: Vec<_> = (0..agents)
        .map(|i| {
            json!({
                "id": format!("agent-{i}"),
                "name": format!("Agent {i}"),
                "ownerId": SYSTEM_USER_ID,
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            })
        })
        .collect();
    let listings: Vec<_> = (0..listings)
        .map(|i| {
            json!({
                "id": format!("listing-{i}"),
                "title": format!("Listing {i}"),
                "agentId": format!("agent-{i}"),
                "createdAt": "2024-02-01T00:00:00Z",
                "updatedAt": "2024-02-01T00:00:00Z"
            })
        })
        .collect();
    fs::write(dir.join(AGENTS_FILE), json!({ "agents": agents }).to_string()).expect("write agents");
    fs::write(dir.join(LISTINGS_FILE), json!({ "listings": listings }).to_string())
        .expect("write listings");
}

#[tokio::test]
async fn full_run_writes_every_phase_in_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_data(dir.path(), 3, 2);

    let mut seeder = Seeder::new(MemoryStore::new(), DataLoader::new(dir.path()));
    assert_eq!(seeder.state(), SeedState::Connected);
    let summary = seeder.run().await?;

    let phases: Vec<_> = summary.reports.iter().map(|r| r.phase).collect();
    assert_eq!(phases, SeedPhase::ALL);
    assert_eq!(summary.count(SeedPhase::SystemUser), 1);
    assert_eq!(summary.count(SeedPhase::Agents), 3);
    assert_eq!(summary.count(SeedPhase::Listings), 2);
    assert_eq!(summary.count(SeedPhase::Badges), 1);
    assert_eq!(summary.count(SeedPhase::CurrencyPackages), 4);
    assert_eq!(seeder.state(), SeedState::Done);

    let store = seeder.store();
    assert_eq!(store.commit_calls(), 5);
    assert_eq!(store.document_ids("users"), ["system"]);
    assert_eq!(store.collection_len("agents"), 3);
    assert_eq!(store.collection_len("marketplace"), 2);
    assert_eq!(store.document_ids("badges"), ["cod-expert"]);
    assert_eq!(
        store.document_ids("dof_packages"),
        ["dof-bronze", "dof-gold", "dof-platinum", "dof-silver"]
    );

    let rendered = summary.to_string();
    assert!(rendered.starts_with("Summary:"));
    assert!(rendered.contains("  - Agents: 3"));
    assert!(rendered.contains("  - DOF packages: 4"));
    Ok(())
}

#[tokio::test]
async fn system_user_replaces_existing_document() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_data(dir.path(), 1, 1);

    let store = MemoryStore::new();
    let mut stale = Document::new();
    stale.insert("legacyFlag".into(), FieldValue::Boolean(true));
    stale.insert("displayName".into(), FieldValue::from("Old System"));
    store.insert("users", SYSTEM_USER_ID, stale);

    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
    let mut seeder = Seeder::new(store, DataLoader::new(dir.path())).with_clock(now);
    seeder.run().await?;

    let user = seeder
        .store()
        .get_document("users", SYSTEM_USER_ID)
        .await?
        .expect("system user stored");
    assert!(!user.contains_key("legacyFlag"));
    assert_eq!(user["displayName"], FieldValue::from("JIGA System"));
    assert_eq!(user["createdAt"], FieldValue::Timestamp(now));
    assert_eq!(user["updatedAt"], FieldValue::Timestamp(now));
    let wallet = user["wallet"].as_map().expect("wallet map");
    assert_eq!(wallet["balance"], FieldValue::Integer(1_000_000_000));
    Ok(())
}

#[tokio::test]
async fn missing_listings_file_stops_the_run_after_agents() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_data(dir.path(), 2, 0);
    fs::remove_file(dir.path().join(LISTINGS_FILE))?;

    let mut seeder = Seeder::new(MemoryStore::new(), DataLoader::new(dir.path()));
    let err = seeder.run().await.unwrap_err();

    let SeedError::Phase { phase, .. } = &err else {
        panic!("expected a phase error, got {err:?}");
    };
    assert_eq!(*phase, SeedPhase::Listings);
    assert!(matches!(err.root(), SeedError::Load(_)));
    assert!(err.to_string().contains(LISTINGS_FILE));
    assert_eq!(seeder.state(), SeedState::Failed(SeedPhase::Listings));

    let store = seeder.store();
    assert_eq!(store.collection_len("users"), 1);
    assert_eq!(store.collection_len("agents"), 2);
    assert_eq!(store.collection_len("marketplace"), 0);
    assert_eq!(store.collection_len("badges"), 0);
    assert_eq!(store.commit_calls(), 2);
    Ok(())
}

/// Rejects every commit touching one collection.
struct RejectingCollection {
    inner: MemoryStore,
    collection: &'static str,
}

#[async_trait]
impl DocumentStore for RejectingCollection {
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        if writes.iter().any(|w| w.collection == self.collection) {
            return Err(StoreError::Rejected {
                status: 409,
                message: "aborted".to_string(),
            });
        }
        self.inner.commit(writes).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(collection, id).await
    }
}

#[tokio::test]
async fn rejected_badge_commit_keeps_earlier_phases() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_data(dir.path(), 2, 2);

    let store = RejectingCollection {
        inner: MemoryStore::new(),
        collection: "badges",
    };
    let mut seeder = Seeder::new(store, DataLoader::new(dir.path()));
    let err = seeder.run().await.unwrap_err();

    assert!(matches!(
        err.root(),
        SeedError::Commit { collection, .. } if collection == "badges"
    ));
    assert_eq!(seeder.state(), SeedState::Failed(SeedPhase::Badges));

    let inner = &seeder.store().inner;
    assert_eq!(inner.collection_len("agents"), 2);
    assert_eq!(inner.collection_len("marketplace"), 2);
    assert_eq!(inner.collection_len("badges"), 0);
    assert_eq!(inner.collection_len("dof_packages"), 0);
    Ok(())
}

/// Accepts commits but never finds anything.
struct ForgetfulStore;

#[async_trait]
impl DocumentStore for ForgetfulStore {
    async fn commit(&self, _writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_document(&self, _: &str, _: &str) -> Result<Option<Document>, StoreError> {
        Ok(None)
    }
}

#[tokio::test]
async fn agents_require_the_system_user() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_data(dir.path(), 1, 1);

    let mut seeder = Seeder::new(ForgetfulStore, DataLoader::new(dir.path()));
    let err = seeder.run().await.unwrap_err();

    assert!(matches!(err.root(), SeedError::Precondition(_)));
    assert_eq!(seeder.state(), SeedState::Failed(SeedPhase::Agents));
    Ok(())
}

#[tokio::test]
async fn shipped_dataset_seeds_cleanly() -> Result<()> {
    let data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data");

    let mut seeder = Seeder::new(MemoryStore::new(), DataLoader::new(data_dir));
    let summary = seeder.run().await?;

    assert_eq!(summary.count(SeedPhase::Agents), 13);
    let mut agent_ids = seeder.store().document_ids("agents");
    agent_ids.sort();
    let mut owned: Vec<String> = jiga_core::catalog::SYSTEM_OWNED_AGENTS
        .iter()
        .map(|id| id.to_string())
        .collect();
    owned.sort();
    assert_eq!(agent_ids, owned);
    Ok(())
}
