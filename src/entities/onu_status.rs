//! ONU status entity - Latest optical reading per unit (one row per `onu_id`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// ONU status database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "onu_status")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub customer_id: i64,
    #[sea_orm(unique)]
    pub onu_id: String,
    /// `"online"`, `"offline"`, `"los"` or `"dying_gasp"`
    pub status: String,
    /// Received optical power in dBm
    pub rx_power: f64,
    /// Transmitted optical power in dBm
    pub tx_power: f64,
    /// Unit temperature in °C
    pub temperature: f64,
    /// Fiber distance to the OLT in meters
    pub distance: i32,
    pub last_update: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
