//! Employee permission storage.
//!
//! Employees without a stored row get [`EmployeePermissions::default`].

use crate::{
    core::policy::EmployeePermissions,
    entities::{EmployeePermission, employee_permission},
    errors::Result,
};
use sea_orm::{Set, prelude::*};

/// Loads the permission flags of an employee, falling back to the defaults.
pub async fn get_employee_permissions<C>(db: &C, user_id: i64) -> Result<EmployeePermissions>
where
    C: ConnectionTrait,
{
    let row = EmployeePermission::find()
        .filter(employee_permission::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    Ok(row.as_ref().map(EmployeePermissions::from).unwrap_or_default())
}

/// Stores the permission flags of an employee, replacing any previous row.
pub async fn set_employee_permissions<C>(
    db: &C,
    user_id: i64,
    permissions: &EmployeePermissions,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = EmployeePermission::find()
        .filter(employee_permission::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    let mut active_model: employee_permission::ActiveModel = match existing {
        Some(row) => row.into(),
        None => employee_permission::ActiveModel {
            user_id: Set(user_id),
            ..Default::default()
        },
    };

    active_model.view_customers = Set(permissions.view_customers);
    active_model.create_customers = Set(permissions.create_customers);
    active_model.edit_customers = Set(permissions.edit_customers);
    active_model.delete_customers = Set(permissions.delete_customers);
    active_model.view_servers = Set(permissions.view_servers);
    active_model.manage_servers = Set(permissions.manage_servers);
    active_model.edit_balance = Set(permissions.edit_balance);
    active_model.view_reports = Set(permissions.view_reports);
    active_model.send_messages = Set(permissions.send_messages);
    active_model.view_transactions = Set(permissions.view_transactions);

    active_model.save(db).await?;
    Ok(())
}

/// Loads every stored permission row keyed by user id.
pub async fn get_all_permissions(
    db: &DatabaseConnection,
) -> Result<Vec<(i64, EmployeePermissions)>> {
    let rows = EmployeePermission::find().all(db).await?;
    Ok(rows
        .iter()
        .map(|row| (row.user_id, EmployeePermissions::from(row)))
        .collect())
}
