//! Background scheduler for the auto-deduction sweep.
//!
//! Wakes up every `scheduler_poll_minutes`, and runs a sweep as the system actor
//! whenever `sweep_interval_hours` have passed since the last recorded one. Because the
//! last sweep time lives in the database, a restart does not cause a double charge.

use crate::{
    config::BillingSettings,
    core::{
        Services,
        policy::Actor,
        sweep::{self, SweepReport, SweepSettings},
    },
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument};

/// Runs a sweep if one is due at `now`.
///
/// Returns `None` when the last sweep is more recent than the configured interval.
#[instrument(skip(db, services, settings))]
pub async fn run_sweep_if_due(
    db: &DatabaseConnection,
    services: &Services,
    settings: &BillingSettings,
    now: DateTime<Utc>,
) -> Result<Option<SweepReport>> {
    let interval = Duration::hours(settings.sweep_interval_hours);
    if !sweep::is_sweep_due(db, now, interval).await? {
        return Ok(None);
    }

    let report = sweep::process_auto_deductions(
        db,
        services,
        &Actor::system(),
        &SweepSettings::from(settings),
        now,
    )
    .await?;
    Ok(Some(report))
}

/// Polls forever, sweeping when due. Errors are logged and the loop carries on.
pub async fn run_sweep_loop(db: DatabaseConnection, services: Services, settings: BillingSettings) {
    let poll = std::time::Duration::from_secs(settings.scheduler_poll_minutes.max(1) * 60);
    let mut ticker = tokio::time::interval(poll);
    info!(
        poll_minutes = settings.scheduler_poll_minutes,
        interval_hours = settings.sweep_interval_hours,
        "Sweep scheduler started"
    );

    loop {
        ticker.tick().await;
        match run_sweep_if_due(&db, &services, &settings, Utc::now()).await {
            Ok(Some(report)) => info!(
                charged = report.deductions.len(),
                skipped = report.skipped.len(),
                alerts = report.alerts_sent,
                suspensions = report.suspensions_sent,
                "Scheduled sweep complete"
            ),
            Ok(None) => {}
            Err(e) => error!("Scheduled sweep failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::customer::get_customer_by_id;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_sweep_runs_once_per_interval() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let (services, _router) = test_services(&db);
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 300.0).await?;
        let settings = BillingSettings::default();
        let start = Utc::now();

        let first = run_sweep_if_due(&db, &services, &settings, start).await?;
        assert_eq!(first.unwrap().deductions.len(), 1);

        let early = run_sweep_if_due(&db, &services, &settings, start + Duration::hours(2)).await?;
        assert!(early.is_none());
        assert_eq!(get_customer_by_id(&db, &admin, customer.id).await?.balance, 290.0);

        let next = run_sweep_if_due(&db, &services, &settings, start + Duration::hours(24)).await?;
        assert!(next.is_some());
        assert_eq!(get_customer_by_id(&db, &admin, customer.id).await?.balance, 280.0);
        Ok(())
    }
}
