//! Router servers and PPPoE provisioning.
//!
//! Server records live in the database; the provisioning client sits behind the
//! [`RouterProvisioner`] trait. [`SimulatedRouter`] stands in for a Mikrotik API client.

use crate::{
    config::RouterSettings,
    core::policy::{Actor, Capability},
    entities::{Customer, MikrotikServer, customer, mikrotik_server},
    errors::{Error, Result},
    models::{CustomerStatus, ServerStatus},
};
use async_trait::async_trait;
use rand::Rng;
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Outcome of a reachability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResult {
    pub success: bool,
    /// Round trip in milliseconds, present on success
    pub latency_ms: Option<u32>,
}

/// Client for the routers that hold customers' PPPoE secrets.
#[async_trait]
pub trait RouterProvisioner: Send + Sync {
    /// Creates the PPPoE secret for a customer with the given rate-limit profile.
    async fn provision(
        &self,
        server_id: i64,
        username: &str,
        password: &str,
        profile: &str,
    ) -> Result<()>;

    /// Enables or disables an existing PPPoE secret.
    async fn set_enabled(&self, server_id: i64, username: &str, enabled: bool) -> Result<()>;

    /// Removes a PPPoE secret.
    async fn deprovision(&self, server_id: i64, username: &str) -> Result<()>;

    async fn ping(&self, host: &str) -> Result<PingResult>;

    /// Number of PPPoE sessions currently up on a server.
    async fn active_connections(&self, server_id: i64) -> Result<u32>;
}

/// Router client that only waits and logs, failing at a configurable rate.
#[derive(Debug, Clone)]
pub struct SimulatedRouter {
    latency: Duration,
    failure_rate: f64,
}

impl SimulatedRouter {
    #[must_use]
    pub fn new(latency: Duration, failure_rate: f64) -> Self {
        let failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        Self {
            latency,
            failure_rate,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &RouterSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.simulated_latency_ms),
            settings.failure_rate,
        )
    }

    async fn call(&self, operation: &str) -> Result<()> {
        tokio::time::sleep(self.latency).await;
        if rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(Error::Provisioning {
                message: format!("simulated router rejected {operation}"),
            });
        }
        Ok(())
    }
}

impl Default for SimulatedRouter {
    fn default() -> Self {
        Self::from_settings(&RouterSettings::default())
    }
}

#[async_trait]
impl RouterProvisioner for SimulatedRouter {
    async fn provision(
        &self,
        server_id: i64,
        username: &str,
        _password: &str,
        profile: &str,
    ) -> Result<()> {
        self.call("provision").await?;
        info!(server_id, username, profile, "Created PPPoE user");
        Ok(())
    }

    async fn set_enabled(&self, server_id: i64, username: &str, enabled: bool) -> Result<()> {
        self.call("set_enabled").await?;
        info!(server_id, username, enabled, "Updated PPPoE user");
        Ok(())
    }

    async fn deprovision(&self, server_id: i64, username: &str) -> Result<()> {
        self.call("deprovision").await?;
        info!(server_id, username, "Deleted PPPoE user");
        Ok(())
    }

    async fn ping(&self, host: &str) -> Result<PingResult> {
        tokio::time::sleep(self.latency * 2).await;
        let mut rng = rand::thread_rng();
        let success = rng.gen_bool(0.8);
        let result = PingResult {
            success,
            latency_ms: success.then(|| rng.gen_range(10..60)),
        };
        debug!(host, ?result, "Pinged host");
        Ok(result)
    }

    async fn active_connections(&self, _server_id: i64) -> Result<u32> {
        tokio::time::sleep(self.latency).await;
        Ok(rand::thread_rng().gen_range(10..60))
    }
}

/// Fields of a new router server.
#[derive(Debug, Clone)]
pub struct NewServer {
    pub name: String,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub password: String,
}

/// Partial update of a router server; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ServerUpdate {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn validate_port(port: i32) -> Result<()> {
    if (1..=65535).contains(&port) {
        Ok(())
    } else {
        Err(Error::Validation {
            message: format!("port must be between 1 and 65535, got {port}"),
        })
    }
}

/// Registers a router server. New servers start offline until checked.
pub async fn add_server(
    db: &DatabaseConnection,
    actor: &Actor,
    new_server: NewServer,
) -> Result<mikrotik_server::Model> {
    actor.require(Capability::ManageServers)?;
    if new_server.name.trim().is_empty() || new_server.host.trim().is_empty() {
        return Err(Error::Validation {
            message: "server name and host are required".to_string(),
        });
    }
    validate_port(new_server.port)?;

    let server = mikrotik_server::ActiveModel {
        name: Set(new_server.name.trim().to_string()),
        host: Set(new_server.host.trim().to_string()),
        port: Set(new_server.port),
        username: Set(new_server.username),
        password: Set(new_server.password),
        status: Set(ServerStatus::Offline.as_str().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(server = %server.name, host = %server.host, "Added router server");
    Ok(server)
}

pub async fn get_server_by_id<C>(db: &C, server_id: i64) -> Result<mikrotik_server::Model>
where
    C: ConnectionTrait,
{
    MikrotikServer::find_by_id(server_id)
        .one(db)
        .await?
        .ok_or(Error::ServerNotFound { id: server_id })
}

/// The server new customers land on when none is chosen.
pub async fn default_server<C>(db: &C) -> Result<mikrotik_server::Model>
where
    C: ConnectionTrait,
{
    MikrotikServer::find()
        .order_by_asc(mikrotik_server::Column::Id)
        .one(db)
        .await?
        .ok_or(Error::NoRouterServer)
}

pub async fn get_all_servers(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<mikrotik_server::Model>> {
    actor.require(Capability::ViewServers)?;
    MikrotikServer::find()
        .order_by_asc(mikrotik_server::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn update_server_status(
    db: &DatabaseConnection,
    server_id: i64,
    status: ServerStatus,
) -> Result<mikrotik_server::Model> {
    let server = get_server_by_id(db, server_id).await?;
    let mut active_model: mikrotik_server::ActiveModel = server.into();
    active_model.status = Set(status.as_str().to_string());
    active_model.update(db).await.map_err(Into::into)
}

/// Pings a server and records whether it answered.
#[instrument(skip(db, router, actor))]
pub async fn check_server(
    db: &DatabaseConnection,
    router: &dyn RouterProvisioner,
    actor: &Actor,
    server_id: i64,
) -> Result<(mikrotik_server::Model, PingResult)> {
    actor.require(Capability::ViewServers)?;
    let server = get_server_by_id(db, server_id).await?;

    let ping = router.ping(&server.host).await?;
    let status = if ping.success {
        ServerStatus::Online
    } else {
        ServerStatus::Offline
    };
    let server = update_server_status(db, server.id, status).await?;

    info!(server = %server.name, %status, latency_ms = ?ping.latency_ms, "Checked router server");
    Ok((server, ping))
}

pub async fn update_server(
    db: &DatabaseConnection,
    actor: &Actor,
    server_id: i64,
    update: ServerUpdate,
) -> Result<mikrotik_server::Model> {
    actor.require(Capability::ManageServers)?;
    let server = get_server_by_id(db, server_id).await?;
    let mut active_model: mikrotik_server::ActiveModel = server.into();

    if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
        active_model.name = Set(name.trim().to_string());
    }
    if let Some(host) = update.host.filter(|h| !h.trim().is_empty()) {
        active_model.host = Set(host.trim().to_string());
    }
    if let Some(port) = update.port {
        validate_port(port)?;
        active_model.port = Set(port);
    }
    if let Some(username) = update.username {
        active_model.username = Set(username);
    }
    if let Some(password) = update.password {
        active_model.password = Set(password);
    }

    active_model.update(db).await.map_err(Into::into)
}

/// Removes a server that no customer is attached to.
pub async fn delete_server(db: &DatabaseConnection, actor: &Actor, server_id: i64) -> Result<()> {
    actor.require(Capability::ManageServers)?;
    let server = get_server_by_id(db, server_id).await?;

    let (total, _) = server_customer_counts(db, server_id).await?;
    if total > 0 {
        return Err(Error::Validation {
            message: format!(
                "server '{}' still has {total} customers attached",
                server.name
            ),
        });
    }

    server.delete(db).await?;
    info!(server_id, by = %actor.username, "Deleted router server");
    Ok(())
}

/// Number of customers on a server, and how many of them are active.
pub async fn server_customer_counts(db: &DatabaseConnection, server_id: i64) -> Result<(u64, u64)> {
    let total = Customer::find()
        .filter(customer::Column::ServerId.eq(server_id))
        .count(db)
        .await?;
    let active = Customer::find()
        .filter(customer::Column::ServerId.eq(server_id))
        .filter(customer::Column::Status.eq(CustomerStatus::Active.as_str()))
        .count(db)
        .await?;
    Ok((total, active))
}
