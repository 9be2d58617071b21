//! Mikrotik server entity - Routers that terminate customer PPPoE sessions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Mikrotik server database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mikrotik_servers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub host: String,
    /// API port
    pub port: i32,
    /// API login
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// `"online"` or `"offline"`
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
