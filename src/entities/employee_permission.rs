//! Employee permission entity - One row of capability flags per employee account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employee permission database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employee_permissions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Employee these flags belong to
    #[sea_orm(unique)]
    pub user_id: i64,
    pub view_customers: bool,
    pub create_customers: bool,
    pub edit_customers: bool,
    pub delete_customers: bool,
    pub view_servers: bool,
    pub manage_servers: bool,
    pub edit_balance: bool,
    pub view_reports: bool,
    pub send_messages: bool,
    pub view_transactions: bool,
}

/// Defines relationships between `EmployeePermission` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each permission record belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
