//! Checks that every third-party credential the store backend needs is
//! configured, and optionally that each one actually works.

mod env_example;
mod probe;

use std::collections::BTreeMap;
use std::env;

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use tracing::{info, warn};

pub use env_example::{write_env_example, ENV_EXAMPLE_FILE, ENV_EXAMPLE_TEMPLATE};
pub use probe::{HttpProber, ProbeEndpoints, ProbeOutcome, ServiceProber};

/// The connectivity check run for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Firestore,
    Shopify,
    OpenAi,
    GoogleAi,
    Algolia,
    Redis,
    SendGrid,
    GoogleAnalytics,
    Sentry,
}

#[derive(Debug, Clone, Copy)]
pub struct ServiceSpec {
    pub name: &'static str,
    pub vars: &'static [&'static str],
    pub optional: bool,
    pub probe: Probe,
}

pub const SERVICES: &[ServiceSpec] = &[
    ServiceSpec {
        name: "Firebase",
        vars: &[
            "FIREBASE_PROJECT_ID",
            "FIREBASE_PRIVATE_KEY",
            "FIREBASE_CLIENT_EMAIL",
        ],
        optional: false,
        probe: Probe::Firestore,
    },
    ServiceSpec {
        name: "Shopify",
        vars: &["SHOPIFY_SHOP_DOMAIN", "SHOPIFY_ADMIN_API_TOKEN"],
        optional: false,
        probe: Probe::Shopify,
    },
    ServiceSpec {
        name: "OpenAI",
        vars: &["OPENAI_API_KEY"],
        optional: false,
        probe: Probe::OpenAi,
    },
    ServiceSpec {
        name: "Google AI",
        vars: &["GOOGLE_AI_API_KEY"],
        optional: false,
        probe: Probe::GoogleAi,
    },
    ServiceSpec {
        name: "Algolia",
        vars: &["ALGOLIA_APP_ID", "ALGOLIA_ADMIN_API_KEY"],
        optional: false,
        probe: Probe::Algolia,
    },
    ServiceSpec {
        name: "Redis",
        vars: &["REDIS_URL"],
        optional: true,
        probe: Probe::Redis,
    },
    ServiceSpec {
        name: "SendGrid",
        vars: &["SENDGRID_API_KEY", "SENDGRID_FROM_EMAIL"],
        optional: false,
        probe: Probe::SendGrid,
    },
    ServiceSpec {
        name: "Google Analytics",
        vars: &["GA_MEASUREMENT_ID"],
        optional: true,
        probe: Probe::GoogleAnalytics,
    },
    ServiceSpec {
        name: "Sentry",
        vars: &["SENTRY_DSN"],
        optional: true,
        probe: Probe::Sentry,
    },
];

/// Environment values captured once, so probes and checks see the same view.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    values: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn from_env() -> Self {
        Self {
            values: env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResult {
    pub name: &'static str,
    pub optional: bool,
    pub valid: bool,
    pub missing_vars: Vec<&'static str>,
    pub probe: Option<ProbeOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    pub results: Vec<ServiceResult>,
}

impl VerificationReport {
    /// Optional services never fail verification.
    pub fn all_required_valid(&self) -> bool {
        self.results
            .iter()
            .all(|result| result.optional || result.valid)
    }

    pub fn result(&self, name: &str) -> Option<&ServiceResult> {
        self.results.iter().find(|result| result.name == name)
    }

    pub fn render_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Service", "Kind", "Status", "Detail"]);

        let required = self.results.iter().filter(|r| !r.optional);
        let optional = self.results.iter().filter(|r| r.optional);
        for result in required.chain(optional) {
            let status = match (result.valid, result.optional) {
                (true, _) => "✓",
                (false, false) => "✗",
                (false, true) => "○",
            };
            let detail = if !result.missing_vars.is_empty() {
                format!("missing {}", result.missing_vars.join(", "))
            } else {
                match &result.probe {
                    Some(ProbeOutcome::Connected) => "connected".to_string(),
                    Some(ProbeOutcome::Warning(message)) => message.clone(),
                    Some(ProbeOutcome::Failed(message)) => message.clone(),
                    None => String::new(),
                }
            };
            table.add_row(vec![
                Cell::new(result.name),
                Cell::new(if result.optional { "optional" } else { "required" }),
                Cell::new(status),
                Cell::new(detail),
            ]);
        }
        table
    }
}

/// Check every known service against `env`. Probes only run when `test` is
/// set and the service has all its variables.
pub async fn verify(
    env: &EnvSnapshot,
    test: bool,
    prober: &dyn ServiceProber,
) -> VerificationReport {
    let mut report = VerificationReport::default();

    for spec in SERVICES {
        let mut missing_vars = Vec::new();
        for var in spec.vars {
            if env.get(var).is_some() {
                info!(service = spec.name, var, "✓ {var} is set");
            } else {
                warn!(service = spec.name, var, "✗ {var} is missing");
                missing_vars.push(*var);
            }
        }

        let mut valid = missing_vars.is_empty();
        let mut outcome = None;
        if test && valid {
            let result = prober.probe(spec.probe, env).await;
            match &result {
                ProbeOutcome::Connected => info!(service = spec.name, "Connected"),
                ProbeOutcome::Warning(message) => {
                    info!(service = spec.name, warning = %message, "Connected with warning")
                }
                ProbeOutcome::Failed(message) => {
                    warn!(service = spec.name, error = %message, "Connection test failed");
                    valid = false;
                }
            }
            outcome = Some(result);
        }

        report.results.push(ServiceResult {
            name: spec.name,
            optional: spec.optional,
            valid,
            missing_vars,
            probe: outcome,
        });
    }

    report
}
