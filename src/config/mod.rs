/// Database configuration and connection management
pub mod database;

/// Application settings loading from config.toml
pub mod settings;

/// Operator bootstrap settings from environment variables
pub mod users;

pub use settings::{AppConfig, BillingSettings, PackageConfig, RouterSettings};
