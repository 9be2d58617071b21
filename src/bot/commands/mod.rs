//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Billing commands: dashboard, alerts, sweep, packages and messages
pub mod billing;

/// Customer management commands
pub mod customer;

/// General utility commands
pub mod general;

/// Router server and ONU commands
pub mod network;

/// Sign-in commands
pub mod session;

/// Operator and reseller administration commands
pub mod users;

// Export commands
pub use billing::*;
pub use customer::*;
pub use general::*;
pub use network::*;
pub use session::*;
pub use users::*;
