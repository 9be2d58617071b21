//! Auto-deduction sweep
//!
//! Charges every active customer one day of their package, sends bill alerts to
//! customers running low and suspension notices to customers who ran out. The time of
//! the last sweep is kept in the `system_state` table so the scheduler can tell when
//! the next one is due.

use crate::{
    config::BillingSettings,
    core::{
        Services,
        alerts::is_customer_alert_eligible,
        customer::notify,
        ledger::{self, BalanceChange},
        messaging::OutgoingMessage,
        package::{daily_rate, get_package_by_id},
        policy::{Actor, Capability},
    },
    entities::{Customer, SystemState, customer, system_state},
    errors::{Error, Result},
    models::{CustomerStatus, TransactionKind},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

const LAST_SWEEP_KEY: &str = "last_auto_deduction_sweep";

/// Attempts per customer when a concurrent balance write gets in the way.
const MAX_DEDUCTION_ATTEMPTS: u32 = 3;

/// Alerting parameters of a sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    /// Alert when `0 < days_remaining <= alert_threshold_days`
    pub alert_threshold_days: i64,
    /// Minimum spacing between two bill alerts to one customer
    pub alert_cooldown: Duration,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self::from(&BillingSettings::default())
    }
}

impl From<&BillingSettings> for SweepSettings {
    fn from(settings: &BillingSettings) -> Self {
        Self {
            alert_threshold_days: settings.alert_threshold_days,
            alert_cooldown: Duration::hours(settings.alert_cooldown_hours),
        }
    }
}

/// One applied daily charge.
#[derive(Debug, Clone)]
pub struct DeductionOutcome {
    pub customer_id: i64,
    pub customer_name: String,
    pub old_balance: f64,
    pub new_balance: f64,
    pub daily_rate: f64,
    pub days_remaining: i64,
    pub alert_sent: bool,
    pub suspended: bool,
}

/// A customer the sweep left alone this time.
#[derive(Debug, Clone)]
pub struct SkippedCustomer {
    pub customer_id: i64,
    pub customer_name: String,
    pub reason: String,
}

/// Result of one sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub processed_at: DateTime<Utc>,
    pub deductions: Vec<DeductionOutcome>,
    pub skipped: Vec<SkippedCustomer>,
    pub alerts_sent: usize,
    pub suspensions_sent: usize,
}

/// Balance after one day of service and the whole days it still covers.
///
/// The balance never goes below zero. `daily_rate` must be positive.
#[must_use]
pub fn plan_deduction(balance: f64, daily_rate: f64) -> (f64, i64) {
    let new_balance = (balance - daily_rate).max(0.0);
    #[allow(clippy::cast_possible_truncation)]
    let days_remaining = (new_balance / daily_rate).floor() as i64;
    (new_balance, days_remaining)
}

/// Whether a bill alert is due for a customer left with `days_remaining` days.
#[must_use]
pub const fn needs_bill_alert(days_remaining: i64, threshold_days: i64) -> bool {
    days_remaining > 0 && days_remaining <= threshold_days
}

/// Time of the last recorded sweep, if any.
pub async fn get_last_sweep_time(db: &DatabaseConnection) -> Result<Option<DateTime<Utc>>> {
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_SWEEP_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => DateTime::parse_from_rfc3339(&s.value)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last sweep time: {e}"),
            }),
        None => Ok(None),
    }
}

async fn set_last_sweep_time<C>(db: &C, at: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    let value = at.to_rfc3339();
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_SWEEP_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(LAST_SWEEP_KEY.to_string()),
            value: Set(value),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Whether `interval` has passed since the last sweep. True when none was recorded.
pub async fn is_sweep_due(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    interval: Duration,
) -> Result<bool> {
    Ok(get_last_sweep_time(db)
        .await?
        .is_none_or(|last| now - last >= interval))
}

/// Charges one day to a customer inside its own transaction, dated `now`.
///
/// Returns `None` when the customer is gone or no longer active by the time it is
/// re-read. Disables the PPPoE secret before committing when the balance runs out.
async fn deduct_once(
    db: &DatabaseConnection,
    services: &Services,
    actor: &Actor,
    customer_id: i64,
    rate: f64,
    now: DateTime<Utc>,
) -> Result<Option<(BalanceChange, i64)>> {
    let txn = db.begin().await?;

    let Some(customer) = Customer::find_by_id(customer_id).one(&txn).await? else {
        return Ok(None);
    };
    if !customer.is_active() || customer.balance <= 0.0 {
        return Ok(None);
    }

    let (new_balance, days_remaining) = plan_deduction(customer.balance, rate);
    let change = ledger::record_balance_change(
        &txn,
        &customer,
        new_balance,
        Some(TransactionKind::Deduction),
        &format!("Daily charge ({rate:.2}/day)"),
        &actor.username,
        now,
    )
    .await?;

    if change.crossed_to_inactive() {
        services
            .router
            .set_enabled(customer.server_id, &customer.username, false)
            .await?;
    }

    txn.commit().await?;
    Ok(Some((change, days_remaining)))
}

/// Cooldown check for a charged customer. A failed lookup sends no alert.
async fn alert_allowed(
    db: &DatabaseConnection,
    customer: &customer::Model,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> bool {
    match is_customer_alert_eligible(db, customer.id, now, cooldown).await {
        Ok(eligible) => eligible,
        Err(e) => {
            warn!(customer = %customer.username, error = %e, "Alert cooldown check failed, no alert sent");
            false
        }
    }
}

async fn deduct_with_retry(
    db: &DatabaseConnection,
    services: &Services,
    actor: &Actor,
    customer_id: i64,
    rate: f64,
    now: DateTime<Utc>,
) -> Result<Option<(BalanceChange, i64)>> {
    let mut attempt = 1;
    loop {
        match deduct_once(db, services, actor, customer_id, rate, now).await {
            Err(Error::ConcurrentModification { .. }) if attempt < MAX_DEDUCTION_ATTEMPTS => {
                warn!(customer_id, attempt, "Balance changed during sweep, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Runs one auto-deduction sweep over all active customers with a positive balance.
///
/// Customers that cannot be charged (missing or misconfigured package, failed
/// lookups, router refusal, persistent write conflicts) are reported as skipped; the
/// sweep carries on. Once charging starts the sweep always records its time, so a
/// failure for one customer never causes a second charge for the others. Notices
/// that fail to send, or whose cooldown cannot be checked, are logged and dropped.
/// Ledger entries and notices are dated `now`.
#[instrument(skip_all, fields(actor = %actor.username))]
pub async fn process_auto_deductions(
    db: &DatabaseConnection,
    services: &Services,
    actor: &Actor,
    settings: &SweepSettings,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    actor.require(Capability::RunSweep)?;

    let candidates = Customer::find()
        .filter(customer::Column::Status.eq(CustomerStatus::Active.as_str()))
        .filter(customer::Column::Balance.gt(0.0))
        .order_by_asc(customer::Column::Id)
        .all(db)
        .await?;

    let mut report = SweepReport {
        processed_at: now,
        deductions: Vec::new(),
        skipped: Vec::new(),
        alerts_sent: 0,
        suspensions_sent: 0,
    };

    for candidate in candidates {
        let mut skip = |reason: String| {
            report.skipped.push(SkippedCustomer {
                customer_id: candidate.id,
                customer_name: candidate.full_name.clone(),
                reason,
            });
        };

        let package = match get_package_by_id(db, candidate.package_id).await {
            Ok(Some(package)) => package,
            Ok(None) => {
                warn!(customer = %candidate.username, package_id = candidate.package_id, "Package not found, skipping");
                skip(format!("package {} not found", candidate.package_id));
                continue;
            }
            Err(e) => {
                warn!(customer = %candidate.username, error = %e, "Package lookup failed, skipping");
                skip(e.to_string());
                continue;
            }
        };
        let rate = match daily_rate(&package) {
            Ok(rate) => rate,
            Err(e) => {
                warn!(customer = %candidate.username, package = %package.name, error = %e, "Misconfigured package, skipping");
                skip(e.to_string());
                continue;
            }
        };

        let (change, days_remaining) =
            match deduct_with_retry(db, services, actor, candidate.id, rate, now).await {
                Ok(Some(applied)) => applied,
                Ok(None) => continue,
                Err(e) => {
                    warn!(customer = %candidate.username, error = %e, "Deduction failed, skipping");
                    skip(e.to_string());
                    continue;
                }
            };

        let mut alert_sent = false;
        if needs_bill_alert(days_remaining, settings.alert_threshold_days)
            && alert_allowed(db, &change.customer, now, settings.alert_cooldown).await
        {
            alert_sent = notify(
                services,
                OutgoingMessage::bill_alert(
                    &change.customer,
                    package.price,
                    days_remaining,
                    &actor.username,
                )
                .at(now),
            )
            .await;
        }

        let suspended = change.crossed_to_inactive();
        if suspended
            && notify(
                services,
                OutgoingMessage::suspension(&change.customer, &actor.username).at(now),
            )
            .await
        {
            report.suspensions_sent += 1;
        }
        if alert_sent {
            report.alerts_sent += 1;
        }

        report.deductions.push(DeductionOutcome {
            customer_id: change.customer.id,
            customer_name: change.customer.full_name.clone(),
            old_balance: change.previous_balance,
            new_balance: change.customer.balance,
            daily_rate: rate,
            days_remaining,
            alert_sent,
            suspended,
        });
    }

    set_last_sweep_time(db, now).await?;

    info!(
        charged = report.deductions.len(),
        skipped = report.skipped.len(),
        alerts = report.alerts_sent,
        suspensions = report.suspensions_sent,
        "Auto-deduction sweep finished"
    );
    Ok(report)
}

/// Renders a sweep report for operators.
pub fn format_sweep_summary(report: &SweepReport) -> Result<String> {
    use std::fmt::Write;

    let mut summary = format!(
        "Auto-deduction sweep - {} - Charged {} customers\n",
        report.processed_at.format("%Y-%m-%d %H:%M UTC"),
        report.deductions.len()
    );
    write!(
        &mut summary,
        "  Alerts: {} | Suspensions: {} | Skipped: {}\n\n",
        report.alerts_sent,
        report.suspensions_sent,
        report.skipped.len()
    )?;

    for outcome in &report.deductions {
        let note = if outcome.suspended {
            " [suspended]"
        } else if outcome.alert_sent {
            " [alerted]"
        } else {
            ""
        };
        writeln!(
            &mut summary,
            "  {} | {:.2} → {:.2} (-{:.2}/day, {} days left){note}",
            outcome.customer_name,
            outcome.old_balance,
            outcome.new_balance,
            outcome.daily_rate,
            outcome.days_remaining
        )?;
    }

    for skipped in &report.skipped {
        writeln!(
            &mut summary,
            "  Skipped {}: {}",
            skipped.customer_name, skipped.reason
        )?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::customer::get_customer_by_id;
    use crate::core::ledger::get_customer_transactions;
    use crate::core::messaging::get_customer_messages;
    use crate::core::policy::EmployeePermissions;
    use crate::models::MessageKind;
    use crate::test_utils::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_plan_deduction() {
        assert_eq!(plan_deduction(40.0, 10.0), (30.0, 3));
        assert_eq!(plan_deduction(10.0, 10.0), (0.0, 0));
        assert_eq!(plan_deduction(4.0, 10.0), (0.0, 0));

        let (balance, days) = plan_deduction(40.0, 500.0 / 30.0);
        assert!(approx(balance, 23.333_333_333));
        assert_eq!(days, 1);
    }

    #[test]
    fn test_needs_bill_alert() {
        assert!(!needs_bill_alert(0, 3));
        assert!(needs_bill_alert(1, 3));
        assert!(needs_bill_alert(3, 3));
        assert!(!needs_bill_alert(4, 3));
    }

    #[tokio::test]
    async fn test_healthy_customer_is_charged_without_alert() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic 5 Mbps", 500.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 1000.0).await?;
        let (services, _router) = test_services(&db);

        let report = process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &SweepSettings::default(),
            Utc::now(),
        )
        .await?;

        assert_eq!(report.deductions.len(), 1);
        assert!(approx(report.deductions[0].new_balance, 983.333_333_333));
        assert_eq!(report.alerts_sent, 0);

        let history = get_customer_transactions(&db, &admin, customer.id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind()?, TransactionKind::Deduction);
        assert!(approx(history[0].amount, 500.0 / 30.0));
        assert_eq!(history[0].created_by, "system");
        assert!(get_customer_messages(&db, customer.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_low_balance_gets_one_alert() -> Result<()> {
        let db = setup_test_db().await?;
        let package = create_test_package(&db, "Basic 5 Mbps", 500.0, 30).await?;
        let customer = create_test_customer(&db, "bob", &package, 40.0).await?;
        let (services, _router) = test_services(&db);

        let report = process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &SweepSettings::default(),
            Utc::now(),
        )
        .await?;

        let outcome = &report.deductions[0];
        assert!(approx(outcome.new_balance, 23.333_333_333));
        assert_eq!(outcome.days_remaining, 1);
        assert!(outcome.alert_sent);
        assert_eq!(report.alerts_sent, 1);

        let messages = get_customer_messages(&db, customer.id).await?;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind()?, MessageKind::BillAlert);
        assert_eq!(messages[0].sent_by, "system");
        Ok(())
    }

    #[tokio::test]
    async fn test_alert_cooldown_suppresses_second_alert() -> Result<()> {
        let db = setup_test_db().await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "bob", &package, 40.0).await?;
        let (services, _router) = test_services(&db);
        let settings = SweepSettings::default();
        let t = Utc::now();

        let first =
            process_auto_deductions(&db, &services, &Actor::system(), &settings, t).await?;
        assert_eq!(first.deductions[0].days_remaining, 3);
        assert_eq!(first.alerts_sent, 1);

        let second = process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &settings,
            t + Duration::hours(23),
        )
        .await?;
        assert_eq!(second.deductions[0].new_balance, 20.0);
        assert_eq!(second.deductions[0].days_remaining, 2);
        assert_eq!(second.alerts_sent, 0);

        let alerts = get_customer_messages(&db, customer.id)
            .await?
            .into_iter()
            .filter(|m| m.message_type == "bill_alert")
            .count();
        assert_eq!(alerts, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_alert_repeats_once_cooldown_has_passed() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "bob", &package, 40.0).await?;
        let (services, _router) = test_services(&db);
        let settings = SweepSettings::default();
        let t = Utc::now();
        let next_day = t + Duration::hours(24);

        let first =
            process_auto_deductions(&db, &services, &Actor::system(), &settings, t).await?;
        assert_eq!(first.alerts_sent, 1);

        let second =
            process_auto_deductions(&db, &services, &Actor::system(), &settings, next_day)
                .await?;
        assert_eq!(second.deductions[0].days_remaining, 2);
        assert!(second.deductions[0].alert_sent);
        assert_eq!(second.alerts_sent, 1);

        // Notices and ledger entries carry the sweep's clock
        let messages = get_customer_messages(&db, customer.id).await?;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sent_at.timestamp(), next_day.timestamp());
        assert_eq!(messages[1].sent_at.timestamp(), t.timestamp());

        let history = get_customer_transactions(&db, &admin, customer.id).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].created_at.timestamp(), next_day.timestamp());
        assert_eq!(history[1].created_at.timestamp(), t.timestamp());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_alert_lookup_still_records_sweep() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let low = create_test_customer(&db, "bob", &package, 40.0).await?;
        let healthy = create_test_customer(&db, "alice", &package, 1000.0).await?;
        let (services, _router) = test_services(&db);
        let now = Utc::now();

        // Cooldown lookups and stored notices both fail from here on
        db.execute_unprepared("DROP TABLE customer_messages").await?;

        let report = process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &SweepSettings::default(),
            now,
        )
        .await?;
        assert_eq!(report.deductions.len(), 2);
        assert!(report.skipped.is_empty());
        assert!(!report.deductions[0].alert_sent);
        assert_eq!(report.alerts_sent, 0);

        assert_eq!(get_customer_by_id(&db, &admin, low.id).await?.balance, 30.0);
        assert_eq!(get_customer_by_id(&db, &admin, healthy.id).await?.balance, 990.0);

        let recorded = get_last_sweep_time(&db).await?.unwrap();
        assert_eq!(recorded.timestamp(), now.timestamp());
        assert!(!is_sweep_due(&db, now + Duration::hours(1), Duration::hours(24)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_balance_suspends() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic 5 Mbps", 500.0, 30).await?;
        let customer = create_test_customer(&db, "carol", &package, 10.0).await?;
        let (services, router) = test_services(&db);

        let report = process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &SweepSettings::default(),
            Utc::now(),
        )
        .await?;

        let outcome = &report.deductions[0];
        assert_eq!(outcome.new_balance, 0.0);
        assert_eq!(outcome.days_remaining, 0);
        assert!(outcome.suspended);
        assert!(!outcome.alert_sent);
        assert_eq!(report.suspensions_sent, 1);

        let stored = get_customer_by_id(&db, &admin, customer.id).await?;
        assert_eq!(stored.status()?, CustomerStatus::Inactive);

        assert_eq!(router.calls().await, vec![RouterCall::SetEnabled {
            server_id: customer.server_id,
            username: "carol".to_string(),
            enabled: false,
        }]);

        let messages = get_customer_messages(&db, customer.id).await?;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind()?, MessageKind::Suspension);

        // Inactive customers are left alone afterwards
        let report = process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &SweepSettings::default(),
            Utc::now(),
        )
        .await?;
        assert!(report.deductions.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_misconfigured_package_is_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let broken = create_test_package(&db, "Broken", 500.0, 0).await?;
        let healthy = create_test_package(&db, "Basic", 300.0, 30).await?;
        let stuck = create_test_customer(&db, "stuck", &broken, 100.0).await?;
        create_test_customer(&db, "fine", &healthy, 100.0).await?;
        let (services, _router) = test_services(&db);

        let report = process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &SweepSettings::default(),
            Utc::now(),
        )
        .await?;

        assert_eq!(report.deductions.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].customer_id, stuck.id);
        assert!(report.skipped[0].reason.contains("Broken"));

        let stored = get_customer_by_id(&db, &admin, stuck.id).await?;
        assert_eq!(stored.balance, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_router_failure_skips_customer_without_charging() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "dave", &package, 5.0).await?;
        let (services, router) = test_services(&db);
        router.set_fail(true).await;

        let report = process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &SweepSettings::default(),
            Utc::now(),
        )
        .await?;

        assert!(report.deductions.is_empty());
        assert_eq!(report.skipped.len(), 1);

        let stored = get_customer_by_id(&db, &admin, customer.id).await?;
        assert_eq!(stored.balance, 5.0);
        assert!(stored.is_active());
        assert!(get_customer_transactions(&db, &admin, customer.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_requires_capability() -> Result<()> {
        let db = setup_test_db().await?;
        let (services, _router) = test_services(&db);
        let employee = employee_actor(&db, "emp", EmployeePermissions::default()).await?;

        let result = process_auto_deductions(
            &db,
            &services,
            &employee,
            &SweepSettings::default(),
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(Error::PermissionDenied { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_time_bookkeeping() -> Result<()> {
        let db = setup_test_db().await?;
        let (services, _router) = test_services(&db);
        let interval = Duration::hours(24);
        let now = Utc::now();

        assert!(get_last_sweep_time(&db).await?.is_none());
        assert!(is_sweep_due(&db, now, interval).await?);

        process_auto_deductions(&db, &services, &Actor::system(), &SweepSettings::default(), now)
            .await?;
        let recorded = get_last_sweep_time(&db).await?.unwrap();
        assert_eq!(recorded.timestamp(), now.timestamp());

        assert!(!is_sweep_due(&db, now + Duration::hours(23), interval).await?);
        assert!(is_sweep_due(&db, now + Duration::hours(24), interval).await?);

        // Re-running overwrites the single state row
        process_auto_deductions(
            &db,
            &services,
            &Actor::system(),
            &SweepSettings::default(),
            now + Duration::hours(24),
        )
        .await?;
        let count = SystemState::find()
            .filter(system_state::Column::Key.eq(LAST_SWEEP_KEY))
            .count(&db)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    fn test_format_sweep_summary() -> Result<()> {
        let report = SweepReport {
            processed_at: DateTime::parse_from_rfc3339("2024-03-01T06:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            deductions: vec![
                DeductionOutcome {
                    customer_id: 1,
                    customer_name: "Alice".to_string(),
                    old_balance: 40.0,
                    new_balance: 30.0,
                    daily_rate: 10.0,
                    days_remaining: 3,
                    alert_sent: true,
                    suspended: false,
                },
                DeductionOutcome {
                    customer_id: 2,
                    customer_name: "Carol".to_string(),
                    old_balance: 10.0,
                    new_balance: 0.0,
                    daily_rate: 10.0,
                    days_remaining: 0,
                    alert_sent: false,
                    suspended: true,
                },
            ],
            skipped: vec![SkippedCustomer {
                customer_id: 3,
                customer_name: "Stuck".to_string(),
                reason: "package 9 not found".to_string(),
            }],
            alerts_sent: 1,
            suspensions_sent: 1,
        };

        let summary = format_sweep_summary(&report)?;
        assert!(summary.contains("2024-03-01 06:00 UTC"));
        assert!(summary.contains("Charged 2 customers"));
        assert!(summary.contains("Alerts: 1 | Suspensions: 1 | Skipped: 1"));
        assert!(summary.contains("Alice | 40.00 → 30.00 (-10.00/day, 3 days left) [alerted]"));
        assert!(summary.contains("Carol | 10.00 → 0.00"));
        assert!(summary.contains("[suspended]"));
        assert!(summary.contains("Skipped Stuck: package 9 not found"));
        Ok(())
    }
}
