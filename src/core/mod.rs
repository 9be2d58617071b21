//! Core business logic - framework-agnostic billing, customer and network operations.
//!
//! Functions take a `DatabaseConnection` (or any `ConnectionTrait` inside a database
//! transaction), the calling [`policy::Actor`], and where external systems are involved
//! the [`Services`] bundle.

pub mod alerts;
pub mod customer;
pub mod ledger;
pub mod messaging;
pub mod onu;
pub mod package;
pub mod password;
pub mod permissions;
pub mod policy;
pub mod report;
pub mod router;
pub mod sweep;
pub mod user;

use std::sync::Arc;

/// External collaborators injected into core operations.
///
/// Production wires the simulated router and probe plus the database-backed messenger;
/// tests swap in deterministic doubles.
#[derive(Clone)]
pub struct Services {
    /// Router provisioning client
    pub router: Arc<dyn router::RouterProvisioner>,
    /// Customer notification sink
    pub messenger: Arc<dyn messaging::Messenger>,
    /// Optical unit telemetry source
    pub onu_probe: Arc<dyn onu::OnuProbe>,
}

impl Services {
    #[must_use]
    pub fn new(
        router: Arc<dyn router::RouterProvisioner>,
        messenger: Arc<dyn messaging::Messenger>,
        onu_probe: Arc<dyn onu::OnuProbe>,
    ) -> Self {
        Self {
            router,
            messenger,
            onu_probe,
        }
    }
}
