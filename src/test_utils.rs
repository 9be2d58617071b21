//! Shared test utilities for the billing core.
//!
//! This module provides helpers for setting up test databases, inserting fixtures with
//! sensible defaults, and deterministic stand-ins for the router and ONU collaborators.

use crate::{
    core::{
        Services,
        messaging::DbMessenger,
        onu::{OnuProbe, OnuReading},
        password::PasswordService,
        permissions,
        policy::{Actor, CapabilitySet, EmployeePermissions},
        router::{self, PingResult, RouterProvisioner},
        user,
    },
    entities::{customer, mikrotik_server, package, user as user_entity},
    errors::{Error, Result},
    models::{CustomerStatus, OnuState, ServerStatus, UserRole},
};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates the admin account and returns its actor.
pub async fn setup_admin(db: &DatabaseConnection) -> Result<Actor> {
    let admin = user::ensure_admin(db, "admin-password").await?;
    Ok(Actor::admin(admin.id, &admin.username))
}

/// Inserts a package directly, without catalog validation.
///
/// Lets tests create misconfigured packages such as a zero duration.
pub async fn create_test_package(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
    duration: i32,
) -> Result<package::Model> {
    package::ActiveModel {
        name: Set(name.to_string()),
        speed: Set("5M/5M".to_string()),
        price: Set(price),
        duration: Set(duration),
        description: Set(format!("{name} test package")),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

pub async fn create_test_server(
    db: &DatabaseConnection,
    name: &str,
) -> Result<mikrotik_server::Model> {
    mikrotik_server::ActiveModel {
        name: Set(name.to_string()),
        host: Set("192.0.2.1".to_string()),
        port: Set(8728),
        username: Set("api".to_string()),
        password: Set("api-secret".to_string()),
        status: Set(ServerStatus::Offline.as_str().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn test_server_id(db: &DatabaseConnection) -> Result<i64> {
    match router::default_server(db).await {
        Ok(server) => Ok(server.id),
        Err(Error::NoRouterServer) => Ok(create_test_server(db, "Test Server").await?.id),
        Err(e) => Err(e),
    }
}

/// Inserts a customer with the given balance, created by user 1.
///
/// # Defaults
/// * `server`: the first registered server, created if none exists
/// * `status`: derived from `balance`
/// * no ledger entries
pub async fn create_test_customer(
    db: &DatabaseConnection,
    username: &str,
    package: &package::Model,
    balance: f64,
) -> Result<customer::Model> {
    create_test_customer_by(db, username, package, balance, 1).await
}

/// Like [`create_test_customer`] with an explicit creator.
pub async fn create_test_customer_by(
    db: &DatabaseConnection,
    username: &str,
    package: &package::Model,
    balance: f64,
    created_by: i64,
) -> Result<customer::Model> {
    insert_customer(db, username, package, balance, created_by, None).await
}

/// Inserts an active fiber customer with an ONU id.
pub async fn create_test_customer_with_onu(
    db: &DatabaseConnection,
    username: &str,
    package: &package::Model,
    onu_id: &str,
) -> Result<customer::Model> {
    insert_customer(db, username, package, 100.0, 1, Some(onu_id.to_string())).await
}

async fn insert_customer(
    db: &DatabaseConnection,
    username: &str,
    package: &package::Model,
    balance: f64,
    created_by: i64,
    onu_id: Option<String>,
) -> Result<customer::Model> {
    let server_id = test_server_id(db).await?;
    customer::ActiveModel {
        username: Set(username.to_string()),
        password: Set(format!("{username}-secret")),
        full_name: Set(format!("{username} Customer")),
        phone: Set("555-0100".to_string()),
        email: Set(None),
        address: Set("1 Test Lane".to_string()),
        package_id: Set(package.id),
        package_name: Set(package.name.clone()),
        balance: Set(balance),
        status: Set(CustomerStatus::from_balance(balance).as_str().to_string()),
        server_id: Set(server_id),
        ip_address: Set(None),
        mac_address: Set(None),
        onu_id: Set(onu_id),
        last_online: Set(None),
        created_by: Set(created_by),
        created_at: Set(chrono::Utc::now()),
        bill_due_date: Set(None),
        auto_renew: Set(false),
        version: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn insert_user(
    db: &DatabaseConnection,
    username: &str,
    role: UserRole,
    balance: f64,
) -> Result<user_entity::Model> {
    user_entity::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(PasswordService::new().hash_password("password")?),
        role: Set(role.as_str().to_string()),
        balance: Set(balance),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts an employee (password `"password"`) with the given permissions.
pub async fn create_test_employee(
    db: &DatabaseConnection,
    username: &str,
    employee_permissions: EmployeePermissions,
) -> Result<user_entity::Model> {
    let employee = insert_user(db, username, UserRole::Employee, 0.0).await?;
    permissions::set_employee_permissions(db, employee.id, &employee_permissions).await?;
    Ok(employee)
}

/// Creates an employee and returns the actor built from the stored account.
pub async fn employee_actor(
    db: &DatabaseConnection,
    username: &str,
    employee_permissions: EmployeePermissions,
) -> Result<Actor> {
    let employee = create_test_employee(db, username, employee_permissions).await?;
    user::actor_for_user(db, &employee).await
}

/// Inserts a reseller (password `"password"`) holding `credit`.
pub async fn create_test_reseller(
    db: &DatabaseConnection,
    username: &str,
    credit: f64,
) -> Result<user_entity::Model> {
    insert_user(db, username, UserRole::Reseller, credit).await
}

#[must_use]
pub fn reseller_actor(reseller: &user_entity::Model) -> Actor {
    Actor::new(
        Some(reseller.id),
        reseller.username.clone(),
        UserRole::Reseller,
        CapabilitySet::reseller(),
    )
}

/// A provisioning call seen by [`FakeRouter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterCall {
    Provision {
        server_id: i64,
        username: String,
        profile: String,
    },
    SetEnabled {
        server_id: i64,
        username: String,
        enabled: bool,
    },
    Deprovision {
        server_id: i64,
        username: String,
    },
}

/// Router double that records successful calls and can be told to fail.
#[derive(Default)]
pub struct FakeRouter {
    calls: RwLock<Vec<RouterCall>>,
    fail: RwLock<bool>,
}

impl FakeRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn calls(&self) -> Vec<RouterCall> {
        self.calls.read().await.clone()
    }

    async fn record(&self, call: RouterCall) -> Result<()> {
        if *self.fail.read().await {
            return Err(Error::Provisioning {
                message: "fake router failure".to_string(),
            });
        }
        self.calls.write().await.push(call);
        Ok(())
    }
}

#[async_trait]
impl RouterProvisioner for FakeRouter {
    async fn provision(
        &self,
        server_id: i64,
        username: &str,
        _password: &str,
        profile: &str,
    ) -> Result<()> {
        self.record(RouterCall::Provision {
            server_id,
            username: username.to_string(),
            profile: profile.to_string(),
        })
        .await
    }

    async fn set_enabled(&self, server_id: i64, username: &str, enabled: bool) -> Result<()> {
        self.record(RouterCall::SetEnabled {
            server_id,
            username: username.to_string(),
            enabled,
        })
        .await
    }

    async fn deprovision(&self, server_id: i64, username: &str) -> Result<()> {
        self.record(RouterCall::Deprovision {
            server_id,
            username: username.to_string(),
        })
        .await
    }

    async fn ping(&self, _host: &str) -> Result<PingResult> {
        let success = !*self.fail.read().await;
        Ok(PingResult {
            success,
            latency_ms: success.then_some(12),
        })
    }

    async fn active_connections(&self, _server_id: i64) -> Result<u32> {
        Ok(self.calls.read().await.len().try_into().unwrap_or(u32::MAX))
    }
}

/// ONU probe double returning a fixed, adjustable received power.
pub struct FakeOnuProbe {
    rx_power: RwLock<f64>,
}

impl FakeOnuProbe {
    #[must_use]
    pub fn new(rx_power: f64) -> Self {
        Self {
            rx_power: RwLock::new(rx_power),
        }
    }

    pub async fn set_rx_power(&self, rx_power: f64) {
        *self.rx_power.write().await = rx_power;
    }
}

#[async_trait]
impl OnuProbe for FakeOnuProbe {
    async fn read(&self, _onu_id: &str) -> Result<OnuReading> {
        let rx_power = *self.rx_power.read().await;
        Ok(OnuReading {
            state: if rx_power < -28.0 {
                OnuState::Los
            } else {
                OnuState::Online
            },
            rx_power,
            tx_power: 2.5,
            temperature: 41.0,
            distance: 1200,
        })
    }
}

/// Services wired with the database messenger and the doubles above.
///
/// Returns the router double so tests can inspect and steer it.
pub fn test_services(db: &DatabaseConnection) -> (Services, Arc<FakeRouter>) {
    let router = Arc::new(FakeRouter::new());
    let services = Services::new(
        Arc::clone(&router) as Arc<dyn RouterProvisioner>,
        Arc::new(DbMessenger::new(db.clone())),
        Arc::new(FakeOnuProbe::new(-21.0)),
    );
    (services, router)
}
