//! Bot configuration
//!
//! Everything operational is configurable via file, not hardcoded.
//! Defaults match the values the ledger assumes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use taskbot_core::{Amount, UserId};
use taskbot_ledger::LedgerConfig;

/// Top-level bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Immutable root-admin user ids, always Full
    #[serde(default)]
    pub root_admins: Vec<i64>,

    /// Referrer commission on the referred user's first approved task
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,

    /// Signup bonus credited to a referred user on registration
    #[serde(default = "default_signup_bonus")]
    pub signup_bonus: Decimal,

    /// Handle shown to users when no content exists yet
    #[serde(default = "default_contact")]
    pub contact: String,

    /// SQLite database url
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_commission_rate() -> Decimal {
    Decimal::new(10, 2)
}

fn default_signup_bonus() -> Decimal {
    Decimal::ONE
}

fn default_contact() -> String {
    "@admin".to_string()
}

fn default_database_url() -> String {
    "sqlite://taskbot.db".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            root_admins: Vec::new(),
            commission_rate: default_commission_rate(),
            signup_bonus: default_signup_bonus(),
            contact: default_contact(),
            database_url: default_database_url(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Root admins as typed ids
    pub fn root_admin_ids(&self) -> Vec<UserId> {
        self.root_admins.iter().copied().map(UserId).collect()
    }

    /// The ledger's view of this configuration
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            commission_rate: self.commission_rate,
            signup_bonus: Amount::new_unchecked(self.signup_bonus),
        }
    }
}
