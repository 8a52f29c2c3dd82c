//! Environment-driven settings for the seeding run.

use std::env;
use std::path::PathBuf;

use jiga_store::{FirestoreConfig, FirestoreEndpoint, ServiceAccountKey};

use crate::error::{Result, SeedError};

pub const PROJECT_ID_VAR: &str = "FIREBASE_PROJECT_ID";
pub const PRIVATE_KEY_VAR: &str = "FIREBASE_PRIVATE_KEY";
pub const CLIENT_EMAIL_VAR: &str = "FIREBASE_CLIENT_EMAIL";
pub const EMULATOR_HOST_VAR: &str = "FIRESTORE_EMULATOR_HOST";
pub const DATA_DIR_VAR: &str = "JIGA_DATA_DIR";

/// Project used for local development when explicitly allowed.
pub const DEV_PROJECT_ID: &str = "jiga-store-dev";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, Default)]
pub struct SeedConfig {
    pub project_id: Option<String>,
    pub client_email: Option<String>,
    pub private_key: Option<String>,
    pub emulator_host: Option<String>,
    pub data_dir: PathBuf,
    /// Fall back to [`DEV_PROJECT_ID`] when no project id is configured.
    pub dev_project_fallback: bool,
}

impl SeedConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            project_id: get(PROJECT_ID_VAR),
            client_email: get(CLIENT_EMAIL_VAR),
            private_key: get(PRIVATE_KEY_VAR),
            emulator_host: get(EMULATOR_HOST_VAR),
            data_dir: get(DATA_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            dev_project_fallback: false,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_dev_project_fallback(mut self, enabled: bool) -> Self {
        self.dev_project_fallback = enabled;
        self
    }

    pub fn resolved_project_id(&self) -> Result<String> {
        match (&self.project_id, self.dev_project_fallback) {
            (Some(project_id), _) => Ok(project_id.clone()),
            (None, true) => Ok(DEV_PROJECT_ID.to_string()),
            (None, false) => Err(SeedError::connection(format!(
                "{PROJECT_ID_VAR} is not set (pass --dev-project-fallback to use '{DEV_PROJECT_ID}')"
            ))),
        }
    }

    /// The emulator wins over service-account credentials when both are set.
    pub fn firestore_config(&self) -> Result<FirestoreConfig> {
        let project_id = self.resolved_project_id()?;

        let endpoint = if let Some(host) = &self.emulator_host {
            FirestoreEndpoint::Emulator(host.clone())
        } else if let (Some(email), Some(key)) = (&self.client_email, &self.private_key) {
            FirestoreEndpoint::Hosted(ServiceAccountKey::new(email.clone(), key))
        } else {
            return Err(SeedError::connection(format!(
                "no credentials: set {PRIVATE_KEY_VAR} and {CLIENT_EMAIL_VAR}, or {EMULATOR_HOST_VAR}"
            )));
        };

        Ok(FirestoreConfig::new(project_id, endpoint))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> SeedConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SeedConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn missing_project_id_fails_unless_fallback_enabled() {
        let cfg = config(&[(EMULATOR_HOST_VAR, "localhost:8080")]);
        assert!(matches!(
            cfg.firestore_config(),
            Err(SeedError::Connection { .. })
        ));

        let cfg = cfg.with_dev_project_fallback(true);
        assert_eq!(cfg.firestore_config().unwrap().project_id, DEV_PROJECT_ID);
    }

    #[test]
    fn emulator_overrides_service_account() {
        let cfg = config(&[
            (PROJECT_ID_VAR, "jiga-prod"),
            (CLIENT_EMAIL_VAR, "svc@jiga-prod.iam.gserviceaccount.com"),
            (PRIVATE_KEY_VAR, "key"),
            (EMULATOR_HOST_VAR, "127.0.0.1:8080"),
        ]);
        let fs = cfg.firestore_config().unwrap();
        assert!(matches!(fs.endpoint, FirestoreEndpoint::Emulator(ref host) if host == "127.0.0.1:8080"));
    }

    #[test]
    fn service_account_used_for_hosted_project() {
        let cfg = config(&[
            (PROJECT_ID_VAR, "jiga-prod"),
            (CLIENT_EMAIL_VAR, "svc@jiga-prod.iam.gserviceaccount.com"),
            (PRIVATE_KEY_VAR, "line1\\nline2"),
        ]);
        match cfg.firestore_config().unwrap().endpoint {
            FirestoreEndpoint::Hosted(key) => assert_eq!(key.private_key, "line1\nline2"),
            other => panic!("unexpected endpoint {other:?}"),
        }
    }

    #[test]
    fn no_credentials_is_a_connection_error() {
        let cfg = config(&[(PROJECT_ID_VAR, "jiga-prod"), (PRIVATE_KEY_VAR, "  ")]);
        assert!(matches!(
            cfg.firestore_config(),
            Err(SeedError::Connection { .. })
        ));
    }

    #[test]
    fn data_dir_defaults_and_overrides() {
        assert_eq!(config(&[]).data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(
            config(&[(DATA_DIR_VAR, "/srv/seed")]).data_dir,
            PathBuf::from("/srv/seed")
        );
    }
}
