//! Transaction entity - Append-only customer balance ledger.
//!
//! Each row records one balance mutation: its `transaction_type` (`recharge`, `deduction`,
//! `adjustment`), the absolute `amount` moved and the `balance` after the change.
//! Rows carry a `customer_name` snapshot and no foreign key, so the audit trail
//! outlives deleted customers.
use crate::models::TransactionKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the customer whose balance changed
    pub customer_id: i64,
    /// Customer full name when the entry was written
    pub customer_name: String,
    /// Type of transaction: `"recharge"`, `"deduction"` or `"adjustment"`
    pub transaction_type: String,
    /// Absolute value of the balance delta
    pub amount: f64,
    /// Balance after the change
    pub balance: f64,
    /// Human-readable description of the transaction
    pub description: String,
    /// Username of the operator (or `"system"`) who made the change
    pub created_by: String,
    /// When the transaction was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Typed kind of this entry.
    pub fn kind(&self) -> crate::errors::Result<TransactionKind> {
        self.transaction_type.parse()
    }
}

/// Ledger entries have no enforced relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
