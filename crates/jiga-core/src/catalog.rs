//! Fixed reference data written on every seeding run: the system account,
//! badge definitions and the DOF currency packages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use jiga_store::{Document, FieldValue};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SeedError};

pub const SYSTEM_USER_ID: &str = "system";

/// Agents the system account owns in the base dataset.
pub const SYSTEM_OWNED_AGENTS: &[&str] = &[
    "scout-observer-001",
    "nova-coordinator-001",
    "ace-elite-001",
    "zeus-commentator-001",
    "coach-mentor-001",
    "ghost-analyst-001",
    "truwakandan-cod-specialist-001",
    "blaze-commentator-001",
    "echo-assistant-001",
    "fable-mentor-001",
    "onyx-specialist-001",
    "hype-commentator-001",
    "shimmer-mentor-001",
];

pub const SYSTEM_PUBLISHED_SPECIALISTS: &[&str] = &["truwakandan-cod-specialist-001"];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar: String,
    pub nationality: String,
    pub timezone: String,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
    pub wallet: Wallet,
    pub owned_agents: Vec<String>,
    pub published_specialists: Vec<String>,
    pub marketplace_stats: MarketplaceStats,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    pub balance: u64,
    pub currency: String,
    pub history: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceStats {
    pub total_earnings: u64,
    pub total_hires: u64,
    pub average_rating: f64,
    pub rating_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub notifications: NotificationPreferences,
    pub privacy: PrivacyPreferences,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
    pub in_app: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyPreferences {
    pub profile_visible: bool,
    pub stats_visible: bool,
}

impl SystemUser {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: SYSTEM_USER_ID.to_string(),
            email: "system@jigastore.com".to_string(),
            display_name: "JIGA System".to_string(),
            avatar: "/avatars/system.png".to_string(),
            nationality: "Global".to_string(),
            timezone: "UTC".to_string(),
            created_at: now,
            updated_at: now,
            wallet: Wallet {
                // 1 billion DOFs for system operations.
                balance: 1_000_000_000,
                currency: "DOF".to_string(),
                history: Vec::new(),
            },
            owned_agents: SYSTEM_OWNED_AGENTS.iter().map(|id| id.to_string()).collect(),
            published_specialists: SYSTEM_PUBLISHED_SPECIALISTS
                .iter()
                .map(|id| id.to_string())
                .collect(),
            marketplace_stats: MarketplaceStats {
                total_earnings: 0,
                total_hires: 0,
                average_rating: 5.0,
                rating_count: 0,
            },
            preferences: Preferences::default(),
        }
    }

    pub fn to_document(&self) -> Result<Document> {
        let mut document = to_document("system user", self)?;
        document.insert("createdAt".into(), FieldValue::Timestamp(self.created_at));
        document.insert("updatedAt".into(), FieldValue::Timestamp(self.updated_at));
        Ok(document)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub game: String,
    pub image_url: String,
    pub specializations: Vec<Specialization>,
    pub requirements: BadgeRequirements,
    pub total_awarded: u32,
    pub active_specialists: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specialization {
    pub mode: String,
    pub description: String,
    pub threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRequirements {
    pub hours_required: u32,
    pub additional_criteria: Vec<String>,
}

impl Badge {
    pub fn to_document(&self) -> Result<Document> {
        to_document("badge", self)
    }
}

fn specialization(mode: &str, description: &str, threshold: u32) -> Specialization {
    Specialization {
        mode: mode.to_string(),
        description: description.to_string(),
        threshold,
    }
}

pub fn badge_definitions() -> Vec<Badge> {
    vec![Badge {
        id: "cod-expert".to_string(),
        name: "Call of Duty Expert".to_string(),
        game: "Call of Duty".to_string(),
        image_url: "/badges/cod-expert.png".to_string(),
        specializations: vec![
            specialization("Multiplayer", "6v6 tactical combat mastery", 800),
            specialization("Warzone", "Battle royale survival and strategy", 1000),
            specialization("Search & Destroy", "Round-based tactical excellence", 600),
            specialization("Cyber Attack", "Objective-based team tactics", 500),
        ],
        requirements: BadgeRequirements {
            hours_required: 500,
            additional_criteria: Vec::new(),
        },
        // truWakandan holds the only one so far.
        total_awarded: 1,
        active_specialists: 1,
    }]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl AgentTier {
    pub const ALL: [AgentTier; 4] = [
        AgentTier::Bronze,
        AgentTier::Silver,
        AgentTier::Gold,
        AgentTier::Platinum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentTier::Bronze => "bronze",
            AgentTier::Silver => "silver",
            AgentTier::Gold => "gold",
            AgentTier::Platinum => "platinum",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyPackage {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub dof_amount: u64,
    pub tier: AgentTier,
    #[serde(rename = "bonusDOF")]
    pub bonus_dof: u64,
    #[serde(rename = "shopifySKU")]
    pub shopify_sku: String,
    pub estimated_hours: BTreeMap<AgentTier, u32>,
    pub active: bool,
}

impl CurrencyPackage {
    pub fn to_document(&self) -> Result<Document> {
        to_document("DOF package", self)
    }
}

fn package(
    tier: AgentTier,
    name: &str,
    description: &str,
    price: f64,
    dof_amount: u64,
    sku: &str,
    hours: [u32; 4],
) -> CurrencyPackage {
    CurrencyPackage {
        id: format!("dof-{}", tier.as_str()),
        name: name.to_string(),
        description: description.to_string(),
        price,
        currency: "USD".to_string(),
        dof_amount,
        tier,
        bonus_dof: 0,
        shopify_sku: sku.to_string(),
        estimated_hours: AgentTier::ALL.into_iter().zip(hours).collect(),
        active: true,
    }
}

/// The four DOF packages sold through Shopify. Estimated hours are the DOF
/// amount divided by each tier's hourly rate.
pub fn currency_packages() -> Vec<CurrencyPackage> {
    vec![
        package(
            AgentTier::Bronze,
            "Bronze DOF Package",
            "150,000 DOFs - Perfect for getting started (~50 hours with Bronze agents)",
            4.99,
            150_000,
            "DOF-150K-BRONZE",
            [50, 27, 18, 10],
        ),
        package(
            AgentTier::Silver,
            "Silver DOF Package",
            "500,000 DOFs - Great value for regular users (~83 hours with Silver agents)",
            14.99,
            500_000,
            "DOF-500K-SILVER",
            [166, 83, 55, 33],
        ),
        package(
            AgentTier::Gold,
            "Gold DOF Package",
            "1,500,000 DOFs - Best for active gamers (~150 hours with Gold agents)",
            39.99,
            1_500_000,
            "DOF-1M5-GOLD",
            [500, 250, 150, 100],
        ),
        package(
            AgentTier::Platinum,
            "Platinum DOF Package",
            "5,000,000 DOFs - Ultimate gaming experience (~333 hours with Platinum agents)",
            99.99,
            5_000_000,
            "DOF-5M-PLATINUM",
            [1666, 833, 500, 333],
        ),
    ]
}

fn to_document<T: Serialize>(what: &str, value: &T) -> Result<Document> {
    let json = serde_json::to_value(value).map_err(|source| SeedError::Serialize {
        what: what.to_string(),
        source,
    })?;
    match FieldValue::from(json) {
        FieldValue::Map(fields) => Ok(fields),
        other => Err(SeedError::Serialize {
            what: what.to_string(),
            source: serde::ser::Error::custom(format!("expected a map, got {}", other.kind())),
        }),
    }
}
