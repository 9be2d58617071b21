//! User entity - Operator accounts (admin, employees, resellers).
//!
//! Passwords are stored as Argon2 PHC strings. Resellers carry a prepaid credit
//! `balance` which they spend on the initial balance of customers they create.

use crate::models::UserRole;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across all operators
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 hash of the login password
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role: `"admin"`, `"employee"` or `"reseller"`
    pub role: String,
    /// Reseller credit; always zero for other roles
    pub balance: f64,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Typed role of this account.
    pub fn role(&self) -> crate::errors::Result<UserRole> {
        self.role.parse()
    }
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// An employee has one permission record
    #[sea_orm(has_one = "super::employee_permission::Entity")]
    EmployeePermission,
}

impl Related<super::employee_permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmployeePermission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
