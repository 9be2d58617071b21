//! Ledger business logic - customer balances and the reseller credit ledger.
//!
//! Every balance write goes through [`record_balance_change`], which performs an
//! optimistic-lock update on the customer row and appends exactly one ledger entry in the
//! same database transaction. Callers that must talk to the router before the change is
//! final (balance edits, the sweep, customer creation) call it on an open transaction and
//! commit only once the router agreed.

use crate::{
    core::{
        customer::get_scoped_customer,
        policy::{Actor, Capability},
        user::get_user_by_id,
    },
    entities::{
        Customer, ResellerTransaction, Transaction, User, customer, reseller_transaction,
        transaction, user,
    },
    errors::{Error, Result},
    models::{CustomerStatus, ResellerTransactionKind, TransactionKind, UserRole},
};
use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info};

/// Result of a committed (or about to be committed) balance write.
#[derive(Debug, Clone)]
pub struct BalanceChange {
    /// The appended ledger entry
    pub transaction: transaction::Model,
    /// Customer row as it is after the write
    pub customer: customer::Model,
    pub previous_balance: f64,
}

impl BalanceChange {
    /// Whether the write moved the customer between active and inactive.
    #[must_use]
    pub fn flipped_active(&self) -> bool {
        (self.previous_balance > 0.0) != (self.customer.balance > 0.0)
    }

    /// Whether the write took the customer from a positive balance to zero or below.
    #[must_use]
    pub fn crossed_to_inactive(&self) -> bool {
        self.previous_balance > 0.0 && self.customer.balance <= 0.0
    }
}

fn validate_balance(balance: f64) -> Result<()> {
    if balance.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidAmount { amount: balance })
    }
}

/// Writes `new_balance` to `customer` and appends the matching ledger entry.
///
/// `customer` must be the row as last read; if another writer bumped its version in
/// the meantime the update matches nothing and `ConcurrentModification` is returned
/// before anything is written. `kind` defaults to the sign-based classification.
/// The ledger entry is stamped `at`.
pub(crate) async fn record_balance_change<C>(
    conn: &C,
    customer: &customer::Model,
    new_balance: f64,
    kind: Option<TransactionKind>,
    description: &str,
    actor_name: &str,
    at: DateTime<Utc>,
) -> Result<BalanceChange>
where
    C: ConnectionTrait,
{
    validate_balance(new_balance)?;

    let delta = new_balance - customer.balance;
    let kind = kind.unwrap_or_else(|| TransactionKind::from_delta(delta));
    let status = CustomerStatus::from_balance(new_balance);

    let result = Customer::update_many()
        .col_expr(customer::Column::Balance, Expr::value(new_balance))
        .col_expr(customer::Column::Status, Expr::value(status.as_str()))
        .col_expr(
            customer::Column::Version,
            Expr::col(customer::Column::Version).add(1),
        )
        .filter(customer::Column::Id.eq(customer.id))
        .filter(customer::Column::Version.eq(customer.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        debug!(customer_id = customer.id, version = customer.version, "stale balance write");
        return Err(Error::ConcurrentModification {
            customer_id: customer.id,
        });
    }

    let entry = transaction::ActiveModel {
        customer_id: Set(customer.id),
        customer_name: Set(customer.full_name.clone()),
        transaction_type: Set(kind.as_str().to_string()),
        amount: Set(delta.abs()),
        balance: Set(new_balance),
        description: Set(description.to_string()),
        created_by: Set(actor_name.to_string()),
        created_at: Set(at),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let mut updated = customer.clone();
    updated.balance = new_balance;
    updated.status = status.as_str().to_string();
    updated.version += 1;

    Ok(BalanceChange {
        transaction: entry,
        customer: updated,
        previous_balance: customer.balance,
    })
}

/// Default description of a manual balance edit.
#[must_use]
pub fn describe_balance_edit(delta: f64) -> &'static str {
    match TransactionKind::from_delta(delta) {
        TransactionKind::Recharge => "Balance recharge",
        _ => "Balance adjustment",
    }
}

/// Sets a customer's balance and appends the ledger entry, without router side effects.
///
/// The entry is a `recharge` for an increase and an `adjustment` otherwise.
pub async fn apply_balance_change(
    db: &DatabaseConnection,
    actor: &Actor,
    customer_id: i64,
    new_balance: f64,
) -> Result<transaction::Model> {
    actor.require(Capability::EditBalance)?;
    validate_balance(new_balance)?;

    let txn = db.begin().await?;
    let customer = get_scoped_customer(&txn, actor, customer_id).await?;
    let change = record_balance_change(
        &txn,
        &customer,
        new_balance,
        None,
        describe_balance_edit(new_balance - customer.balance),
        &actor.username,
        Utc::now(),
    )
    .await?;
    txn.commit().await?;

    info!(
        customer = %change.customer.username,
        from = change.previous_balance,
        to = new_balance,
        by = %actor.username,
        "Balance changed"
    );
    Ok(change.transaction)
}

/// Ledger entries of one customer, newest first.
pub async fn get_customer_transactions(
    db: &DatabaseConnection,
    actor: &Actor,
    customer_id: i64,
) -> Result<Vec<transaction::Model>> {
    actor.require(Capability::ViewTransactions)?;
    if actor.customer_scope().is_some() {
        get_scoped_customer(db, actor, customer_id).await?;
    }

    Transaction::find()
        .filter(transaction::Column::CustomerId.eq(customer_id))
        .order_by_desc(transaction::Column::CreatedAt)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All ledger entries visible to the actor, newest first.
pub async fn get_all_transactions(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<transaction::Model>> {
    actor.require(Capability::ViewTransactions)?;

    let mut query = Transaction::find();
    if let Some(creator) = actor.customer_scope() {
        let owned: Vec<i64> = Customer::find()
            .filter(customer::Column::CreatedBy.eq(creator))
            .all(db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        query = query.filter(transaction::Column::CustomerId.is_in(owned));
    }

    query
        .order_by_desc(transaction::Column::CreatedAt)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn recharge_total_between(
    db: &DatabaseConnection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<f64> {
    let entries = Transaction::find()
        .filter(transaction::Column::TransactionType.eq(TransactionKind::Recharge.as_str()))
        .filter(transaction::Column::CreatedAt.gte(start))
        .filter(transaction::Column::CreatedAt.lt(end))
        .all(db)
        .await?;
    Ok(entries.iter().map(|t| t.amount).sum())
}

/// Sum of recharges made on the UTC day of `now`.
pub async fn today_revenue(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<f64> {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    recharge_total_between(db, start, start + chrono::Duration::days(1)).await
}

/// Sum of recharges made in the UTC calendar month of `now`.
pub async fn month_revenue(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<f64> {
    let first_day = now
        .date_naive()
        .with_day(1)
        .ok_or_else(|| Error::Validation {
            message: format!("cannot compute month start for {now}"),
        })?;
    let start = first_day.and_time(NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| Error::Validation {
            message: format!("cannot compute month end for {now}"),
        })?;
    recharge_total_between(db, start, end).await
}

async fn load_reseller<C>(conn: &C, reseller_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let reseller = get_user_by_id(conn, reseller_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: reseller_id.to_string(),
        })?;
    if reseller.role()? != UserRole::Reseller {
        return Err(Error::Validation {
            message: format!("'{}' is not a reseller", reseller.username),
        });
    }
    Ok(reseller)
}

fn validate_credit_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAmount { amount })
    }
}

/// Adds `delta` to a reseller's credit and appends the entry. Returns the new credit.
async fn move_reseller_credit<C>(
    conn: &C,
    reseller: &user::Model,
    delta: f64,
    kind: ResellerTransactionKind,
    description: String,
) -> Result<reseller_transaction::Model>
where
    C: ConnectionTrait,
{
    let mut update = User::update_many()
        .col_expr(user::Column::Balance, Expr::col(user::Column::Balance).add(delta))
        .filter(user::Column::Id.eq(reseller.id));
    if delta < 0.0 {
        // Guard against a concurrent debit draining the credit below zero
        update = update.filter(user::Column::Balance.gte(-delta));
    }
    let result = update.exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(Error::InsufficientCredit {
            available: reseller.balance,
            required: -delta,
        });
    }

    let balance = get_user_by_id(conn, reseller.id)
        .await?
        .map_or(reseller.balance + delta, |u| u.balance);

    reseller_transaction::ActiveModel {
        reseller_id: Set(reseller.id),
        reseller_name: Set(reseller.username.clone()),
        transaction_type: Set(kind.as_str().to_string()),
        amount: Set(delta.abs()),
        balance: Set(balance),
        description: Set(description),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(Into::into)
}

/// Tops up a reseller's prepaid credit.
pub async fn add_reseller_credit(
    db: &DatabaseConnection,
    actor: &Actor,
    reseller_id: i64,
    amount: f64,
) -> Result<reseller_transaction::Model> {
    actor.require(Capability::ManageUsers)?;
    validate_credit_amount(amount)?;

    let txn = db.begin().await?;
    let reseller = load_reseller(&txn, reseller_id).await?;
    let entry = move_reseller_credit(
        &txn,
        &reseller,
        amount,
        ResellerTransactionKind::CreditPurchase,
        "Credit added by admin".to_string(),
    )
    .await?;
    txn.commit().await?;

    info!(reseller = %reseller.username, amount, balance = entry.balance, "Reseller credit added");
    Ok(entry)
}

/// Returns credit to a reseller, for example after a cancelled connection.
pub async fn refund_reseller_credit(
    db: &DatabaseConnection,
    actor: &Actor,
    reseller_id: i64,
    amount: f64,
    reason: &str,
) -> Result<reseller_transaction::Model> {
    actor.require(Capability::ManageUsers)?;
    validate_credit_amount(amount)?;

    let txn = db.begin().await?;
    let reseller = load_reseller(&txn, reseller_id).await?;
    let description = if reason.trim().is_empty() {
        "Refund".to_string()
    } else {
        format!("Refund: {}", reason.trim())
    };
    let entry = move_reseller_credit(
        &txn,
        &reseller,
        amount,
        ResellerTransactionKind::Refund,
        description,
    )
    .await?;
    txn.commit().await?;

    info!(reseller = %reseller.username, amount, "Reseller credit refunded");
    Ok(entry)
}

/// Debits a reseller for the initial balance of a customer they are creating.
///
/// Runs on the caller's transaction so a later failure undoes the debit.
pub(crate) async fn charge_reseller_for_customer<C>(
    conn: &C,
    reseller_id: i64,
    amount: f64,
    customer_username: &str,
) -> Result<reseller_transaction::Model>
where
    C: ConnectionTrait,
{
    validate_credit_amount(amount)?;
    let reseller = load_reseller(conn, reseller_id).await?;
    if reseller.balance < amount {
        return Err(Error::InsufficientCredit {
            available: reseller.balance,
            required: amount,
        });
    }

    move_reseller_credit(
        conn,
        &reseller,
        -amount,
        ResellerTransactionKind::CustomerCreation,
        format!("Created customer {customer_username}"),
    )
    .await
}

/// Credit ledger of one reseller, newest first. Resellers may read their own.
pub async fn get_reseller_transactions(
    db: &DatabaseConnection,
    actor: &Actor,
    reseller_id: i64,
) -> Result<Vec<reseller_transaction::Model>> {
    if actor.user_id != Some(reseller_id) {
        actor.require(Capability::ManageUsers)?;
    }

    ResellerTransaction::find()
        .filter(reseller_transaction::Column::ResellerId.eq(reseller_id))
        .order_by_desc(reseller_transaction::Column::CreatedAt)
        .order_by_desc(reseller_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_all_reseller_transactions(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<reseller_transaction::Model>> {
    actor.require(Capability::ManageUsers)?;

    ResellerTransaction::find()
        .order_by_desc(reseller_transaction::Column::CreatedAt)
        .order_by_desc(reseller_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::customer::get_customer_by_id;
    use crate::core::policy::EmployeePermissions;
    use crate::test_utils::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_apply_balance_change_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let admin = Actor::admin(1, "admin");

        let result = apply_balance_change(&db, &admin, 1, f64::NAN).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = apply_balance_change(&db, &admin, 1, f64::INFINITY).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_recharge_and_adjustment_entries() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 100.0).await?;

        let entry = apply_balance_change(&db, &admin, customer.id, 250.0).await?;
        assert_eq!(entry.kind()?, TransactionKind::Recharge);
        assert_eq!(entry.amount, 150.0);
        assert_eq!(entry.balance, 250.0);
        assert_eq!(entry.description, "Balance recharge");
        assert_eq!(entry.created_by, "admin");

        let entry = apply_balance_change(&db, &admin, customer.id, 0.0).await?;
        assert_eq!(entry.kind()?, TransactionKind::Adjustment);
        assert_eq!(entry.amount, 250.0);

        let stored = get_customer_by_id(&db, &admin, customer.id).await?;
        assert_eq!(stored.balance, 0.0);
        assert_eq!(stored.status()?, CustomerStatus::Inactive);
        assert_eq!(stored.version, customer.version + 2);

        let history = get_customer_transactions(&db, &admin, customer.id).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].balance, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_delta_is_an_adjustment() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 100.0).await?;

        let entry = apply_balance_change(&db, &admin, customer.id, 100.0).await?;
        assert_eq!(entry.kind()?, TransactionKind::Adjustment);
        assert_eq!(entry.amount, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected_without_side_effects() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let stale = create_test_customer(&db, "alice", &package, 100.0).await?;

        apply_balance_change(&db, &admin, stale.id, 120.0).await?;

        let result =
            record_balance_change(&db, &stale, 999.0, None, "late writer", "admin", Utc::now())
                .await;
        assert!(matches!(
            result,
            Err(Error::ConcurrentModification { customer_id }) if customer_id == stale.id
        ));

        let stored = get_customer_by_id(&db, &admin, stale.id).await?;
        assert_eq!(stored.balance, 120.0);
        assert_eq!(
            get_customer_transactions(&db, &admin, stale.id).await?.len(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_customer() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let result = apply_balance_change(&db, &admin, 404, 10.0).await;
        assert!(matches!(result, Err(Error::CustomerNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_balance_edit_requires_capability() -> Result<()> {
        let db = setup_test_db().await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 100.0).await?;
        let employee = employee_actor(&db, "emp", EmployeePermissions::default()).await?;

        let result = apply_balance_change(&db, &employee, customer.id, 10.0).await;
        assert!(matches!(result, Err(Error::PermissionDenied { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_revenue_counts_only_recharges_in_window() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 100.0).await?;

        apply_balance_change(&db, &admin, customer.id, 400.0).await?; // +300 recharge
        apply_balance_change(&db, &admin, customer.id, 350.0).await?; // adjustment

        let now = Utc::now();
        assert_eq!(today_revenue(&db, now).await?, 300.0);
        assert_eq!(month_revenue(&db, now).await?, 300.0);

        let long_ago = Utc.with_ymd_and_hms(2001, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(today_revenue(&db, long_ago).await?, 0.0);
        assert_eq!(month_revenue(&db, long_ago).await?, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reseller_credit_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let reseller = create_test_reseller(&db, "shop", 0.0).await?;

        let entry = add_reseller_credit(&db, &admin, reseller.id, 1000.0).await?;
        assert_eq!(entry.transaction_type, "credit_purchase");
        assert_eq!(entry.balance, 1000.0);
        assert_eq!(entry.description, "Credit added by admin");

        let entry = charge_reseller_for_customer(&db, reseller.id, 400.0, "bob").await?;
        assert_eq!(entry.transaction_type, "customer_creation");
        assert_eq!(entry.balance, 600.0);
        assert_eq!(entry.description, "Created customer bob");

        let entry = refund_reseller_credit(&db, &admin, reseller.id, 100.0, "cancelled").await?;
        assert_eq!(entry.balance, 700.0);

        let history = get_reseller_transactions(&db, &admin, reseller.id).await?;
        assert_eq!(history.len(), 3);
        assert_eq!(get_all_reseller_transactions(&db, &admin).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_reseller_charge_needs_credit() -> Result<()> {
        let db = setup_test_db().await?;
        let reseller = create_test_reseller(&db, "shop", 50.0).await?;

        let result = charge_reseller_for_customer(&db, reseller.id, 80.0, "bob").await;
        assert!(matches!(
            result,
            Err(Error::InsufficientCredit { available, required })
                if available == 50.0 && required == 80.0
        ));
        assert!(
            get_user_by_id(&db, reseller.id).await?.unwrap().balance == 50.0,
            "credit must be untouched"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_add_credit_rejects_non_resellers() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let employee = create_test_employee(&db, "emp", EmployeePermissions::default()).await?;

        let result = add_reseller_credit(&db, &admin, employee.id, 10.0).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let reseller = create_test_reseller(&db, "shop", 0.0).await?;
        let result = add_reseller_credit(&db, &admin, reseller.id, -5.0).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        Ok(())
    }
}
