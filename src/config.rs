//! Application configuration.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Runtime configuration for the trade flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fraction of account equity risked per trade (0.01 = 1%)
    pub risk_fraction: Decimal,

    /// Bound on each venue deploy/connect/open wait, in seconds
    pub connect_timeout_secs: u64,

    /// Venue account identifier, if a real venue is wired in
    pub venue_account_id: Option<String>,

    /// Venue API credential, if a real venue is wired in
    pub venue_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            risk_fraction: dec!(0.01),        // Risk 1% per trade
            connect_timeout_secs: 30,
            venue_account_id: None,
            venue_api_key: None,
        }
    }
}

impl AppConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// Recognized variables: `RISK_FACTOR`, `CONNECT_TIMEOUT_SECS`,
    /// `VENUE_ACCOUNT_ID`, `VENUE_API_KEY`. A malformed value logs a
    /// warning and keeps the default rather than aborting startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("RISK_FACTOR") {
            match Decimal::from_str(&raw) {
                Ok(v) if v > Decimal::ZERO && v < Decimal::ONE => config.risk_fraction = v,
                _ => warn!(value = %raw, "ignoring invalid RISK_FACTOR"),
            }
        }

        if let Ok(raw) = std::env::var("CONNECT_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(v) if v > 0 => config.connect_timeout_secs = v,
                _ => warn!(value = %raw, "ignoring invalid CONNECT_TIMEOUT_SECS"),
            }
        }

        config.venue_account_id = std::env::var("VENUE_ACCOUNT_ID").ok();
        config.venue_api_key = std::env::var("VENUE_API_KEY").ok();

        config
    }
}
