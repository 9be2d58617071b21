//! Dashboard reporting.
//!
//! Gathers the headline numbers operators see first: customer counts, revenue and how
//! many customers are about to run out of balance. Resellers get figures for their own
//! customers only, plus their remaining credit.

use crate::{
    core::{
        customer::{customers_needing_alert, get_all_customers},
        ledger::{get_all_transactions, month_revenue, today_revenue},
        policy::{Actor, Capability},
        user::get_user_by_id,
    },
    errors::Result,
    models::TransactionKind,
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::DatabaseConnection;

/// Headline figures for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_customers: usize,
    pub active_customers: usize,
    pub inactive_customers: usize,
    /// Recharges on the UTC day of the report
    pub today_revenue: f64,
    /// Recharges in the UTC month of the report
    pub month_revenue: f64,
    /// Active customers within the alert threshold
    pub customers_needing_alert: usize,
    /// Remaining credit, for resellers
    pub reseller_credit: Option<f64>,
}

/// Recharges on the actor's own customers, for the day and the month of `now`.
async fn scoped_revenue(
    db: &DatabaseConnection,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<(f64, f64)> {
    let entries = get_all_transactions(db, actor).await?;
    let today = now.date_naive();

    let mut day_total = 0.0;
    let mut month_total = 0.0;
    for entry in entries
        .iter()
        .filter(|t| t.transaction_type == TransactionKind::Recharge.as_str())
    {
        let date = entry.created_at.date_naive();
        if date.year() == today.year() && date.month() == today.month() {
            month_total += entry.amount;
            if date == today {
                day_total += entry.amount;
            }
        }
    }
    Ok((day_total, month_total))
}

/// Builds the dashboard for `actor` as of `now`.
pub async fn dashboard_stats(
    db: &DatabaseConnection,
    actor: &Actor,
    alert_threshold_days: i64,
    now: DateTime<Utc>,
) -> Result<DashboardStats> {
    actor.require(Capability::ViewReports)?;

    let customers = get_all_customers(db, actor).await?;
    let active_customers = customers.iter().filter(|c| c.is_active()).count();
    let needing_alert = customers_needing_alert(db, actor, alert_threshold_days)
        .await?
        .len();

    let (today, month, reseller_credit) = match actor.customer_scope() {
        Some(reseller_id) => {
            let (today, month) = scoped_revenue(db, actor, now).await?;
            let credit = get_user_by_id(db, reseller_id).await?.map(|u| u.balance);
            (today, month, credit)
        }
        None => (
            today_revenue(db, now).await?,
            month_revenue(db, now).await?,
            None,
        ),
    };

    Ok(DashboardStats {
        total_customers: customers.len(),
        active_customers,
        inactive_customers: customers.len() - active_customers,
        today_revenue: today,
        month_revenue: month,
        customers_needing_alert: needing_alert,
        reseller_credit,
    })
}

/// Renders dashboard figures as plain text.
pub fn format_dashboard(stats: &DashboardStats) -> Result<String> {
    use std::fmt::Write;

    let mut text = format!(
        "Customers: {} total | {} active | {} inactive\n\
         Revenue: {:.2} today | {:.2} this month\n\
         Needing alert: {}",
        stats.total_customers,
        stats.active_customers,
        stats.inactive_customers,
        stats.today_revenue,
        stats.month_revenue,
        stats.customers_needing_alert
    );
    if let Some(credit) = stats.reseller_credit {
        write!(&mut text, "\nAvailable credit: {credit:.2}")?;
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::ledger::apply_balance_change;
    use crate::core::policy::EmployeePermissions;
    use crate::errors::Error;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_admin_dashboard() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let low = create_test_customer(&db, "low", &package, 20.0).await?;
        create_test_customer(&db, "rich", &package, 900.0).await?;
        create_test_customer(&db, "off", &package, 0.0).await?;

        apply_balance_change(&db, &admin, low.id, 30.0).await?;

        let stats = dashboard_stats(&db, &admin, 3, Utc::now()).await?;
        assert_eq!(stats.total_customers, 3);
        assert_eq!(stats.active_customers, 2);
        assert_eq!(stats.inactive_customers, 1);
        assert_eq!(stats.today_revenue, 10.0);
        assert_eq!(stats.month_revenue, 10.0);
        assert_eq!(stats.customers_needing_alert, 1);
        assert!(stats.reseller_credit.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_reseller_dashboard_is_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let reseller = create_test_reseller(&db, "shop", 250.0).await?;
        let mine = create_test_customer_by(&db, "mine", &package, 100.0, reseller.id).await?;
        let theirs = create_test_customer(&db, "theirs", &package, 100.0).await?;

        apply_balance_change(&db, &admin, mine.id, 150.0).await?;
        apply_balance_change(&db, &admin, theirs.id, 400.0).await?;

        let stats = dashboard_stats(&db, &reseller_actor(&reseller), 3, Utc::now()).await?;
        assert_eq!(stats.total_customers, 1);
        assert_eq!(stats.today_revenue, 50.0);
        assert_eq!(stats.month_revenue, 50.0);
        assert_eq!(stats.reseller_credit, Some(250.0));

        let text = format_dashboard(&stats)?;
        assert!(text.contains("Customers: 1 total"));
        assert!(text.contains("Available credit: 250.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_requires_capability() -> Result<()> {
        let db = setup_test_db().await?;
        let employee = employee_actor(&db, "emp", EmployeePermissions::default()).await?;
        let result = dashboard_stats(&db, &employee, 3, Utc::now()).await;
        assert!(matches!(result, Err(Error::PermissionDenied { .. })));
        Ok(())
    }
}
