use std::time::Duration;

use async_trait::async_trait;
use jiga_store::{
    DocumentStore, FirestoreConfig, FirestoreEndpoint, FirestoreStore, ServiceAccountKey,
};
use reqwest::{Client, RequestBuilder};
use tokio::time::timeout;
use url::Url;

use super::{EnvSnapshot, Probe};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Connected,
    /// Reachable or well-formed, but not fully verifiable.
    Warning(String),
    Failed(String),
}

#[async_trait]
pub trait ServiceProber: Send + Sync {
    async fn probe(&self, probe: Probe, env: &EnvSnapshot) -> ProbeOutcome;
}

/// Base URLs for the HTTP probes.
#[derive(Debug, Clone)]
pub struct ProbeEndpoints {
    pub openai: String,
    pub google_ai: String,
    pub sendgrid: String,
    /// Scheme used with `SHOPIFY_SHOP_DOMAIN`.
    pub shopify_scheme: String,
    /// Replaces `https://{app}-dsn.algolia.net` when set.
    pub algolia: Option<String>,
}

impl Default for ProbeEndpoints {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com".to_string(),
            google_ai: "https://generativelanguage.googleapis.com".to_string(),
            sendgrid: "https://api.sendgrid.com".to_string(),
            shopify_scheme: "https".to_string(),
            algolia: None,
        }
    }
}

pub struct HttpProber {
    client: Client,
    endpoints: ProbeEndpoints,
}

impl HttpProber {
    pub fn new(endpoints: ProbeEndpoints) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self { client, endpoints })
    }

    async fn http_ok(&self, request: RequestBuilder) -> ProbeOutcome {
        match request.send().await {
            Ok(response) if response.status().is_success() => ProbeOutcome::Connected,
            Ok(response) => ProbeOutcome::Failed(format!("Status: {}", response.status().as_u16())),
            Err(err) => ProbeOutcome::Failed(err.to_string()),
        }
    }

    async fn firestore(&self, env: &EnvSnapshot) -> ProbeOutcome {
        let (Some(project_id), Some(email), Some(key)) = (
            env.get("FIREBASE_PROJECT_ID"),
            env.get("FIREBASE_CLIENT_EMAIL"),
            env.get("FIREBASE_PRIVATE_KEY"),
        ) else {
            return ProbeOutcome::Failed("Firebase credentials incomplete".to_string());
        };

        let endpoint = match env.get("FIRESTORE_EMULATOR_HOST") {
            Some(host) => FirestoreEndpoint::Emulator(host.to_string()),
            None => FirestoreEndpoint::Hosted(ServiceAccountKey::new(email, key)),
        };
        let config = FirestoreConfig::new(project_id, endpoint);

        let store = match FirestoreStore::connect(config).await {
            Ok(store) => store,
            Err(err) => return ProbeOutcome::Failed(err.to_string()),
        };
        match store.get_document("_test", "test").await {
            Ok(_) => ProbeOutcome::Connected,
            Err(err) => ProbeOutcome::Failed(err.to_string()),
        }
    }

    async fn algolia(&self, app_id: &str, api_key: &str) -> ProbeOutcome {
        let base = self
            .endpoints
            .algolia
            .clone()
            .unwrap_or_else(|| format!("https://{app_id}-dsn.algolia.net"));
        let request = self
            .client
            .get(format!("{base}/1/indexes"))
            .header("X-Algolia-Application-Id", app_id)
            .header("X-Algolia-API-Key", api_key);
        self.http_ok(request).await
    }
}

#[async_trait]
impl ServiceProber for HttpProber {
    async fn probe(&self, probe: Probe, env: &EnvSnapshot) -> ProbeOutcome {
        let var = |key: &str| env.get(key).unwrap_or_default().to_string();

        match probe {
            Probe::Firestore => self.firestore(env).await,
            Probe::Shopify => {
                let url = format!(
                    "{}://{}/admin/api/2024-01/shop.json",
                    self.endpoints.shopify_scheme,
                    var("SHOPIFY_SHOP_DOMAIN")
                );
                let request = self
                    .client
                    .get(url)
                    .header("X-Shopify-Access-Token", var("SHOPIFY_ADMIN_API_TOKEN"));
                self.http_ok(request).await
            }
            Probe::OpenAi => {
                let request = self
                    .client
                    .get(format!("{}/v1/models", self.endpoints.openai))
                    .bearer_auth(var("OPENAI_API_KEY"));
                self.http_ok(request).await
            }
            Probe::GoogleAi => {
                let request = self
                    .client
                    .get(format!("{}/v1/models", self.endpoints.google_ai))
                    .query(&[("key", var("GOOGLE_AI_API_KEY"))]);
                self.http_ok(request).await
            }
            Probe::Algolia => {
                self.algolia(&var("ALGOLIA_APP_ID"), &var("ALGOLIA_ADMIN_API_KEY"))
                    .await
            }
            Probe::Redis => match timeout(PROBE_TIMEOUT, redis_ping(&var("REDIS_URL"))).await {
                Ok(Ok(())) => ProbeOutcome::Connected,
                Ok(Err(message)) => ProbeOutcome::Failed(message),
                Err(_) => ProbeOutcome::Failed("timed out".to_string()),
            },
            Probe::SendGrid => {
                let request = self
                    .client
                    .get(format!("{}/v3/scopes", self.endpoints.sendgrid))
                    .bearer_auth(var("SENDGRID_API_KEY"));
                self.http_ok(request).await
            }
            Probe::GoogleAnalytics => {
                ProbeOutcome::Warning("Cannot test GA connectivity".to_string())
            }
            Probe::Sentry => sentry_dsn(&var("SENTRY_DSN")),
        }
    }
}

async fn redis_ping(redis_url: &str) -> Result<(), String> {
    let client =
        redis::Client::open(redis_url).map_err(|err| format!("invalid REDIS_URL: {err}"))?;
    let mut connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|err| err.to_string())?;
    let reply: String = redis::cmd("PING")
        .query_async(&mut connection)
        .await
        .map_err(|err| err.to_string())?;
    if reply == "PONG" {
        Ok(())
    } else {
        Err(format!("unexpected PING reply: {reply}"))
    }
}

/// A DSN has the shape `https://<key>@<host>/<project>`.
fn sentry_dsn(dsn: &str) -> ProbeOutcome {
    let url = match Url::parse(dsn) {
        Ok(url) => url,
        Err(err) => return ProbeOutcome::Failed(format!("invalid DSN: {err}")),
    };
    let well_formed = matches!(url.scheme(), "http" | "https")
        && !url.username().is_empty()
        && url.host_str().is_some()
        && !url.path().trim_matches('/').is_empty();
    if well_formed {
        ProbeOutcome::Warning("Sentry DSN is well-formed, cannot verify connectivity".to_string())
    } else {
        ProbeOutcome::Failed("DSN must look like https://<key>@<host>/<project>".to_string())
    }
}
