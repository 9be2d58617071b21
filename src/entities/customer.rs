//! Customer entity - Subscribers with a prepaid balance.
//!
//! `status` always follows the balance sign after any ledger write, and `version` is
//! bumped on every balance mutation so concurrent writers can detect lost updates.

use crate::models::CustomerStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Unique identifier for the customer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// PPPoE login, unique
    #[sea_orm(unique)]
    pub username: String,
    /// PPPoE secret, pushed to the router and sent in the credentials notice
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    /// Package the customer pays for
    pub package_id: i64,
    /// Package name at the time it was assigned
    pub package_name: String,
    /// Prepaid balance in currency units
    pub balance: f64,
    /// `"active"`, `"inactive"` or `"suspended"`
    pub status: String,
    /// Router server holding the PPPoE secret
    pub server_id: i64,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    /// Optical unit identifier, if the customer is on fiber
    pub onu_id: Option<String>,
    pub last_online: Option<DateTimeUtc>,
    /// Operator (user id) who created the customer
    pub created_by: i64,
    pub created_at: DateTimeUtc,
    pub bill_due_date: Option<DateTimeUtc>,
    pub auto_renew: bool,
    /// Optimistic lock counter for balance writes
    pub version: i64,
}

impl Model {
    /// Typed status of this customer.
    pub fn status(&self) -> crate::errors::Result<CustomerStatus> {
        self.status.parse()
    }

    /// Whether the customer currently has service.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active.as_str()
    }
}

/// Defines relationships between Customer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each customer subscribes to one package
    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::PackageId",
        to = "super::package::Column::Id"
    )]
    Package,
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
