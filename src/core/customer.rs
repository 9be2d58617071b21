//! Customer business logic - subscriber lifecycle and balance edits.
//!
//! Operations that touch the router do so while their database transaction is still
//! open. If the router refuses, the transaction is dropped uncommitted and the customer,
//! the ledger and any reseller debit stay as they were.

use crate::{
    core::{
        Services,
        ledger::{self, BalanceChange},
        messaging::OutgoingMessage,
        package::{daily_rate, get_package_by_id},
        policy::{Actor, Capability},
        router,
    },
    entities::{Customer, OnuStatus, customer, onu_status},
    errors::{Error, Result},
    models::{CustomerStatus, TransactionKind, UserRole},
};
use chrono::{Duration, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{error, info, instrument, warn};

/// Fields of a new customer.
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub package_id: i64,
    /// Opening balance, recorded as the "Initial recharge" entry
    pub initial_balance: f64,
    /// Router server; the first registered server when `None`
    pub server_id: Option<i64>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub onu_id: Option<String>,
    pub auto_renew: bool,
}

/// Side effects of [`create_customer`].
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    /// Create the PPPoE secret on the router
    pub provision: bool,
    /// Send the credentials notice after creation
    pub send_credentials: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            provision: true,
            send_credentials: true,
        }
    }
}

/// Profile changes; `None` keeps the stored value. Balance and status are not editable here.
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub package_id: Option<i64>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub onu_id: Option<String>,
    pub auto_renew: Option<bool>,
}

fn not_found(customer_id: i64) -> Error {
    Error::CustomerNotFound {
        id: customer_id.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Loads a customer the actor may see.
///
/// Customers outside a reseller's scope are reported as missing.
pub async fn get_scoped_customer<C>(db: &C, actor: &Actor, customer_id: i64) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    Customer::find_by_id(customer_id)
        .one(db)
        .await?
        .filter(|customer| actor.can_access_customer(customer))
        .ok_or_else(|| not_found(customer_id))
}

async fn find_by_username<C>(db: &C, username: &str) -> Result<Option<customer::Model>>
where
    C: ConnectionTrait,
{
    Customer::find()
        .filter(customer::Column::Username.eq(username.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Hands a notice to the messenger. Delivery failures are logged, never propagated.
pub(crate) async fn notify(services: &Services, message: OutgoingMessage) -> bool {
    let customer_id = message.customer_id;
    let kind = message.kind;
    match services.messenger.send(message).await {
        Ok(()) => true,
        Err(e) => {
            error!(customer_id, %kind, error = %e, "Failed to send customer notice");
            false
        }
    }
}

/// Creates a customer, funds the opening balance and provisions the PPPoE secret.
///
/// When a reseller creates the customer, the opening balance is debited from the
/// reseller's credit in the same transaction.
#[instrument(skip(db, services, actor, new_customer), fields(username = %new_customer.username))]
pub async fn create_customer(
    db: &DatabaseConnection,
    services: &Services,
    actor: &Actor,
    new_customer: NewCustomer,
    options: CreateOptions,
) -> Result<customer::Model> {
    actor.require(Capability::CreateCustomers)?;

    let username = new_customer.username.trim().to_string();
    let full_name = new_customer.full_name.trim().to_string();
    if username.is_empty() || new_customer.password.is_empty() || full_name.is_empty() {
        return Err(Error::Validation {
            message: "username, password and full name are required".to_string(),
        });
    }
    let initial_balance = new_customer.initial_balance;
    if !initial_balance.is_finite() || initial_balance < 0.0 {
        return Err(Error::InvalidAmount {
            amount: initial_balance,
        });
    }
    let created_by = actor.user_id.ok_or_else(|| Error::Validation {
        message: "customers must be created by an operator account".to_string(),
    })?;

    let package = get_package_by_id(db, new_customer.package_id)
        .await?
        .ok_or_else(|| Error::PackageNotFound {
            id: new_customer.package_id.to_string(),
        })?;
    if find_by_username(db, &username).await?.is_some() {
        return Err(Error::DuplicateUsername { username });
    }

    let txn = db.begin().await?;

    let server = match new_customer.server_id {
        Some(server_id) => router::get_server_by_id(&txn, server_id).await?,
        None => router::default_server(&txn).await?,
    };

    if actor.role == UserRole::Reseller && initial_balance > 0.0 {
        ledger::charge_reseller_for_customer(&txn, created_by, initial_balance, &username)
            .await?;
    }

    let now = Utc::now();
    let mut created = customer::ActiveModel {
        username: Set(username.clone()),
        password: Set(new_customer.password),
        full_name: Set(full_name),
        phone: Set(new_customer.phone.trim().to_string()),
        email: Set(non_empty(new_customer.email)),
        address: Set(new_customer.address.trim().to_string()),
        package_id: Set(package.id),
        package_name: Set(package.name.clone()),
        balance: Set(0.0),
        status: Set(CustomerStatus::Inactive.as_str().to_string()),
        server_id: Set(server.id),
        ip_address: Set(non_empty(new_customer.ip_address)),
        mac_address: Set(non_empty(new_customer.mac_address)),
        onu_id: Set(non_empty(new_customer.onu_id)),
        last_online: Set(None),
        created_by: Set(created_by),
        created_at: Set(now),
        bill_due_date: Set(Some(now + Duration::days(i64::from(package.duration)))),
        auto_renew: Set(new_customer.auto_renew),
        version: Set(0),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if initial_balance > 0.0 {
        let change = ledger::record_balance_change(
            &txn,
            &created,
            initial_balance,
            Some(TransactionKind::Recharge),
            "Initial recharge",
            &actor.username,
            now,
        )
        .await?;
        created = change.customer;
    }

    if options.provision {
        if let Err(e) = services
            .router
            .provision(server.id, &created.username, &created.password, &package.speed)
            .await
        {
            error!(server = %server.name, error = %e, "Provisioning failed, customer not created");
            return Err(e);
        }
    }

    txn.commit().await?;
    info!(
        customer = %created.username,
        package = %package.name,
        balance = created.balance,
        by = %actor.username,
        "Created customer"
    );

    if options.send_credentials {
        notify(
            services,
            OutgoingMessage::credentials(&created, &package.name, &actor.username),
        )
        .await;
    }

    Ok(created)
}

async fn write_balance<F>(
    db: &DatabaseConnection,
    services: &Services,
    actor: &Actor,
    customer_id: i64,
    target: F,
) -> Result<BalanceChange>
where
    F: FnOnce(&customer::Model) -> f64 + Send,
{
    actor.require(Capability::EditBalance)?;

    let txn = db.begin().await?;
    let customer = get_scoped_customer(&txn, actor, customer_id).await?;
    let new_balance = target(&customer);
    let change = ledger::record_balance_change(
        &txn,
        &customer,
        new_balance,
        None,
        ledger::describe_balance_edit(new_balance - customer.balance),
        &actor.username,
        Utc::now(),
    )
    .await?;

    if change.flipped_active() {
        let enabled = change.customer.balance > 0.0;
        if let Err(e) = services
            .router
            .set_enabled(customer.server_id, &customer.username, enabled)
            .await
        {
            error!(customer = %customer.username, enabled, error = %e, "Router update failed, balance unchanged");
            return Err(e);
        }
    }

    txn.commit().await?;
    info!(
        customer = %change.customer.username,
        from = change.previous_balance,
        to = change.customer.balance,
        by = %actor.username,
        "Balance updated"
    );

    if change.crossed_to_inactive() {
        notify(
            services,
            OutgoingMessage::suspension(&change.customer, &actor.username),
        )
        .await;
    }

    Ok(change)
}

/// Sets a customer's balance, toggling the PPPoE secret when service starts or stops.
///
/// A customer going from a positive balance to zero or below gets a suspension notice.
pub async fn update_customer_balance(
    db: &DatabaseConnection,
    services: &Services,
    actor: &Actor,
    customer_id: i64,
    new_balance: f64,
) -> Result<BalanceChange> {
    if !new_balance.is_finite() {
        return Err(Error::InvalidAmount {
            amount: new_balance,
        });
    }
    write_balance(db, services, actor, customer_id, |_| new_balance).await
}

/// Adds `amount` to a customer's balance.
pub async fn recharge_customer(
    db: &DatabaseConnection,
    services: &Services,
    actor: &Actor,
    customer_id: i64,
    amount: f64,
) -> Result<BalanceChange> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    write_balance(db, services, actor, customer_id, |customer| {
        customer.balance + amount
    })
    .await
}

/// Edits profile fields and the package of a customer.
pub async fn update_customer_profile(
    db: &DatabaseConnection,
    actor: &Actor,
    customer_id: i64,
    update: CustomerUpdate,
) -> Result<customer::Model> {
    actor.require(Capability::EditCustomers)?;
    let customer = get_scoped_customer(db, actor, customer_id).await?;
    let mut active_model: customer::ActiveModel = customer.into();

    if let Some(full_name) = non_empty(update.full_name) {
        active_model.full_name = Set(full_name);
    }
    if let Some(phone) = update.phone {
        active_model.phone = Set(phone.trim().to_string());
    }
    if let Some(address) = update.address {
        active_model.address = Set(address.trim().to_string());
    }
    if update.email.is_some() {
        active_model.email = Set(non_empty(update.email));
    }
    if update.ip_address.is_some() {
        active_model.ip_address = Set(non_empty(update.ip_address));
    }
    if update.mac_address.is_some() {
        active_model.mac_address = Set(non_empty(update.mac_address));
    }
    if update.onu_id.is_some() {
        active_model.onu_id = Set(non_empty(update.onu_id));
    }
    if let Some(auto_renew) = update.auto_renew {
        active_model.auto_renew = Set(auto_renew);
    }
    if let Some(package_id) = update.package_id {
        let package = get_package_by_id(db, package_id)
            .await?
            .ok_or_else(|| Error::PackageNotFound {
                id: package_id.to_string(),
            })?;
        active_model.package_id = Set(package.id);
        active_model.package_name = Set(package.name);
    }

    let updated = active_model.update(db).await?;
    info!(customer = %updated.username, by = %actor.username, "Updated customer profile");
    Ok(updated)
}

/// Removes the PPPoE secret, then the customer.
///
/// Ledger entries and messages are kept.
pub async fn delete_customer(
    db: &DatabaseConnection,
    services: &Services,
    actor: &Actor,
    customer_id: i64,
) -> Result<()> {
    actor.require(Capability::DeleteCustomers)?;
    let customer = get_scoped_customer(db, actor, customer_id).await?;

    if let Err(e) = services
        .router
        .deprovision(customer.server_id, &customer.username)
        .await
    {
        error!(customer = %customer.username, error = %e, "Deprovisioning failed, customer kept");
        return Err(e);
    }

    let txn = db.begin().await?;
    OnuStatus::delete_many()
        .filter(onu_status::Column::CustomerId.eq(customer.id))
        .exec(&txn)
        .await?;
    let username = customer.username.clone();
    customer.delete(&txn).await?;
    txn.commit().await?;

    info!(customer = %username, by = %actor.username, "Deleted customer");
    Ok(())
}

/// Customers visible to the actor, ordered by name.
pub async fn get_all_customers(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<customer::Model>> {
    actor.require(Capability::ViewCustomers)?;

    let mut query = Customer::find();
    if let Some(creator) = actor.customer_scope() {
        query = query.filter(customer::Column::CreatedBy.eq(creator));
    }
    query
        .order_by_asc(customer::Column::FullName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Customers created by one operator. Resellers only get results for themselves.
pub async fn get_customers_by_creator(
    db: &DatabaseConnection,
    actor: &Actor,
    creator_id: i64,
) -> Result<Vec<customer::Model>> {
    actor.require(Capability::ViewCustomers)?;
    if actor.customer_scope().is_some_and(|own| own != creator_id) {
        return Ok(Vec::new());
    }

    Customer::find()
        .filter(customer::Column::CreatedBy.eq(creator_id))
        .order_by_asc(customer::Column::FullName)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_customer_by_id(
    db: &DatabaseConnection,
    actor: &Actor,
    customer_id: i64,
) -> Result<customer::Model> {
    actor.require(Capability::ViewCustomers)?;
    get_scoped_customer(db, actor, customer_id).await
}

pub async fn get_customer_by_username(
    db: &DatabaseConnection,
    actor: &Actor,
    username: &str,
) -> Result<customer::Model> {
    actor.require(Capability::ViewCustomers)?;
    find_by_username(db, username)
        .await?
        .filter(|customer| actor.can_access_customer(customer))
        .ok_or_else(|| Error::CustomerNotFound {
            id: username.to_string(),
        })
}

/// Active customers whose balance covers `threshold_days` days of service or fewer.
///
/// Customers on misconfigured packages are left out.
pub async fn customers_needing_alert(
    db: &DatabaseConnection,
    actor: &Actor,
    threshold_days: i64,
) -> Result<Vec<(customer::Model, i64)>> {
    let customers = get_all_customers(db, actor).await?;

    let mut needing = Vec::new();
    for customer in customers {
        if !customer.is_active() || customer.balance <= 0.0 {
            continue;
        }
        let Some(package) = get_package_by_id(db, customer.package_id).await? else {
            continue;
        };
        let rate = match daily_rate(&package) {
            Ok(rate) => rate,
            Err(e) => {
                warn!(customer = %customer.username, error = %e, "Skipping alert check");
                continue;
            }
        };
        #[allow(clippy::cast_possible_truncation)]
        let days_remaining = (customer.balance / rate).floor() as i64;
        if days_remaining <= threshold_days {
            needing.push((customer, days_remaining));
        }
    }
    Ok(needing)
}
