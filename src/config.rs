//! Runtime configuration for the ledger.
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use crate::domain::interest::DEFAULT_MONTHLY_RATE;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub monthly_interest_rate: Decimal,
    /// Retries on a stale-version write before giving up with a conflict.
    pub max_retries: u32,
    pub lock_timeout_ms: u64,
    pub admin: AdminSeed,
}

/// The administrator account created on first start.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub group: u8,
    pub opening_balance: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            monthly_interest_rate: DEFAULT_MONTHLY_RATE,
            max_retries: 3,
            lock_timeout_ms: 5_000,
            admin: AdminSeed::default(),
        }
    }
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            name: "Administrador".to_string(),
            email: "admin@example.com".to_string(),
            group: 1,
            opening_balance: dec!(10000),
        }
    }
}

impl LedgerConfig {
    /// Loads a JSON config file and validates it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            LedgerError::ConfigError(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.monthly_interest_rate < Decimal::ZERO {
            return Err(LedgerError::ConfigError(format!(
                "monthly_interest_rate must not be negative, got {}",
                self.monthly_interest_rate
            )));
        }
        if self.lock_timeout_ms == 0 {
            return Err(LedgerError::ConfigError(
                "lock_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.admin.opening_balance < Decimal::ZERO {
            return Err(LedgerError::ConfigError(
                "admin.opening_balance must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
