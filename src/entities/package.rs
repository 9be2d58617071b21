//! Package entity - Internet plans sold to customers.
//!
//! A package costs `price` for `duration` days; the sweep charges
//! `price / duration` per day. `speed` doubles as the router PPPoE profile.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Package database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    /// Unique identifier for the package
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Standard 10 Mbps")
    #[sea_orm(unique)]
    pub name: String,
    /// Rate limit / router profile (e.g., "10M/10M")
    pub speed: String,
    /// Price per billing period
    pub price: f64,
    /// Billing period length in days
    pub duration: i32,
    /// Free-text description
    pub description: String,
}

/// Defines relationships between Package and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One package has many customers
    #[sea_orm(has_many = "super::customer::Entity")]
    Customers,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
