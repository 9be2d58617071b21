//! Operator bootstrap configuration from environment variables.
//!
//! The admin account is created on first start with the password from
//! `ADMIN_PASSWORD`, falling back to a well-known default that should be changed.

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Gets the initial admin password, warning when the built-in default is used.
#[must_use]
pub fn get_admin_password() -> String {
    std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
        tracing::warn!(
            "ADMIN_PASSWORD not set, the admin account will use the default password; change it after first login"
        );
        DEFAULT_ADMIN_PASSWORD.to_string()
    })
}
