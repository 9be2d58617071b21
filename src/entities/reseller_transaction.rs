//! Reseller transaction entity - Append-only ledger of reseller credit movements.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reseller transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reseller_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub reseller_id: i64,
    /// Reseller username when the entry was written
    pub reseller_name: String,
    /// `"credit_purchase"`, `"customer_creation"` or `"refund"`
    pub transaction_type: String,
    /// Absolute credit moved
    pub amount: f64,
    /// Reseller credit after the change
    pub balance: f64,
    pub description: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
