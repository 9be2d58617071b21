//! Customer message entity - Notifications sent to customers.
//!
//! Messages are written once; only `is_read` changes afterwards. Bill alerts in this
//! table double as the history the alert-suppression guard looks at.

use crate::models::MessageKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer message database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub subject: String,
    pub body: String,
    /// `"general"`, `"bill_alert"`, `"credentials"` or `"suspension"`
    pub message_type: String,
    /// Username of the sender, `"system"` for automatic notices
    pub sent_by: String,
    pub sent_at: DateTimeUtc,
    pub is_read: bool,
}

impl Model {
    /// Typed kind of this message.
    pub fn kind(&self) -> crate::errors::Result<MessageKind> {
        self.message_type.parse()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
