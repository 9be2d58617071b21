use crate::core::policy::Capability;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Customer not found: {id}")]
    CustomerNotFound { id: String },

    #[error("Package not found: {id}")]
    PackageNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Router server not found: {id}")]
    ServerNotFound { id: i64 },

    #[error("Message not found: {id}")]
    MessageNotFound { id: i64 },

    #[error("No router server configured, add a Mikrotik server first")]
    NoRouterServer,

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("Package '{name}' is misconfigured: {reason}")]
    InvalidPackage { name: String, reason: String },

    #[error("Permission denied: '{capability}' is required")]
    PermissionDenied { capability: Capability },

    #[error("Insufficient reseller credit: available {available:.2}, required {required:.2}")]
    InsufficientCredit { available: f64, required: f64 },

    #[error("Customer {customer_id} was modified concurrently")]
    ConcurrentModification { customer_id: i64 },

    #[error("Username already taken: {username}")]
    DuplicateUsername { username: String },

    #[error("Router provisioning failed: {message}")]
    Provisioning { message: String },

    #[error("ONU probe failed: {message}")]
    Probe { message: String },

    #[error("Password hashing error: {message}")]
    PasswordHash { message: String },

    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Errors caused by operator input or business rules rather than infrastructure.
    ///
    /// The console answers these with a plain reply instead of escalating them
    /// to the framework error handler.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::CustomerNotFound { .. }
                | Self::PackageNotFound { .. }
                | Self::UserNotFound { .. }
                | Self::ServerNotFound { .. }
                | Self::MessageNotFound { .. }
                | Self::NoRouterServer
                | Self::InvalidAmount { .. }
                | Self::Validation { .. }
                | Self::InvalidPackage { .. }
                | Self::PermissionDenied { .. }
                | Self::InsufficientCredit { .. }
                | Self::ConcurrentModification { .. }
                | Self::DuplicateUsername { .. }
                | Self::Provisioning { .. }
                | Self::Probe { .. }
        )
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
