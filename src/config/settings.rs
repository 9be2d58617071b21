//! Application settings loading from config.toml
//!
//! The file holds billing thresholds, simulated router behaviour and the package
//! catalog used to seed an empty database. Every section is optional; missing
//! values fall back to the defaults documented on each field.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Upper bound for every hour-based setting (one leap year).
const MAX_HOURS: i64 = 24 * 366;
const MAX_POLL_MINUTES: u64 = 24 * 366 * 60;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Sweep and alerting settings
    #[serde(default)]
    pub billing: BillingSettings,
    /// Simulated router behaviour
    #[serde(default)]
    pub router: RouterSettings,
    /// Package catalog seeded when the packages table is empty
    #[serde(default = "default_packages")]
    pub packages: Vec<PackageConfig>,
}

impl AppConfig {
    /// Checks value ranges that TOML typing cannot express.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        let billing = &self.billing;
        if billing.alert_threshold_days < 0 {
            return Err(invalid("billing.alert_threshold_days must be 0 or more"));
        }
        if !(0..=MAX_HOURS).contains(&billing.alert_cooldown_hours) {
            return Err(invalid(&format!(
                "billing.alert_cooldown_hours must be between 0 and {MAX_HOURS}"
            )));
        }
        if !(1..=MAX_HOURS).contains(&billing.sweep_interval_hours) {
            return Err(invalid(&format!(
                "billing.sweep_interval_hours must be between 1 and {MAX_HOURS}"
            )));
        }
        if !(1..=MAX_POLL_MINUTES).contains(&billing.scheduler_poll_minutes) {
            return Err(invalid(&format!(
                "billing.scheduler_poll_minutes must be between 1 and {MAX_POLL_MINUTES}"
            )));
        }

        let rate = self.router.failure_rate;
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(invalid("router.failure_rate must be a number between 0 and 1"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::Config {
        message: format!("Invalid config.toml: {message}"),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            billing: BillingSettings::default(),
            router: RouterSettings::default(),
            packages: default_packages(),
        }
    }
}

/// Settings for the auto-deduction sweep and bill alerts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingSettings {
    /// Alert when this many days of service or fewer remain (default 3)
    pub alert_threshold_days: i64,
    /// Minimum hours between two bill alerts to the same customer (default 24)
    pub alert_cooldown_hours: i64,
    /// Hours between two scheduled sweeps (default 24)
    pub sweep_interval_hours: i64,
    /// Minutes between scheduler checks for a due sweep (default 60)
    pub scheduler_poll_minutes: u64,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            alert_threshold_days: 3,
            alert_cooldown_hours: 24,
            sweep_interval_hours: 24,
            scheduler_poll_minutes: 60,
        }
    }
}

/// Settings for the simulated router client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Artificial delay of provisioning calls in milliseconds (default 500)
    pub simulated_latency_ms: u64,
    /// Probability in `[0, 1]` that a provisioning call fails (default 0)
    pub failure_rate: f64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            simulated_latency_ms: 500,
            failure_rate: 0.0,
        }
    }
}

/// Configuration for a single package
#[derive(Debug, Deserialize, Clone)]
pub struct PackageConfig {
    /// Display name
    pub name: String,
    /// Router profile / rate limit
    pub speed: String,
    /// Price per period
    pub price: f64,
    /// Period length in days
    pub duration: i32,
    /// Free-text description
    #[serde(default)]
    pub description: String,
}

fn default_packages() -> Vec<PackageConfig> {
    [
        ("Basic 5 Mbps", "5M/5M", 500.0, "5 Mbps unlimited"),
        ("Standard 10 Mbps", "10M/10M", 800.0, "10 Mbps unlimited"),
        ("Premium 20 Mbps", "20M/20M", 1200.0, "20 Mbps unlimited"),
        ("Ultra 50 Mbps", "50M/50M", 2000.0, "50 Mbps unlimited"),
    ]
    .into_iter()
    .map(|(name, speed, price, description)| PackageConfig {
        name: name.to_string(),
        speed: speed.to_string(),
        price,
        duration: 30,
        description: description.to_string(),
    })
    .collect()
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
/// - A value is out of range (see [`AppConfig::validate`])
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from the default location (./config.toml)
///
/// A missing file is not an error: the built-in defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = Path::new("config.toml");
    if !path.exists() {
        tracing::warn!("config.toml not found, using built-in defaults");
        return Ok(AppConfig::default());
    }
    load_config(path)
}
