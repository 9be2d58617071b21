//! Package business logic - the internet plan catalog.
//!
//! Provides catalog lookups, seeding from configuration, and the daily rate used by
//! the auto-deduction sweep.

use crate::{
    config::PackageConfig,
    core::policy::{Actor, Capability},
    entities::{Package, package},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Fields for a new package.
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub name: String,
    pub speed: String,
    pub price: f64,
    pub duration: i32,
    pub description: String,
}

impl From<&PackageConfig> for NewPackage {
    fn from(config: &PackageConfig) -> Self {
        Self {
            name: config.name.clone(),
            speed: config.speed.clone(),
            price: config.price,
            duration: config.duration,
            description: config.description.clone(),
        }
    }
}

/// Cost of one day of service: `price / duration`.
///
/// Fails with `InvalidPackage` when the package cannot be billed per day, which
/// covers a zero or negative duration and a non-positive price.
pub fn daily_rate(package: &package::Model) -> Result<f64> {
    if package.duration <= 0 {
        return Err(Error::InvalidPackage {
            name: package.name.clone(),
            reason: format!("duration must be positive, got {}", package.duration),
        });
    }
    if !package.price.is_finite() || package.price <= 0.0 {
        return Err(Error::InvalidPackage {
            name: package.name.clone(),
            reason: format!("price must be positive, got {}", package.price),
        });
    }
    Ok(package.price / f64::from(package.duration))
}

/// Retrieves all packages ordered by price.
pub async fn get_all_packages(db: &DatabaseConnection) -> Result<Vec<package::Model>> {
    Package::find()
        .order_by_asc(package::Column::Price)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_package_by_id<C>(db: &C, package_id: i64) -> Result<Option<package::Model>>
where
    C: ConnectionTrait,
{
    Package::find_by_id(package_id)
        .one(db)
        .await
        .map_err(Into::into)
}

pub async fn get_package_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<package::Model>> {
    Package::find()
        .filter(package::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn insert_package<C>(db: &C, new_package: NewPackage) -> Result<package::Model>
where
    C: ConnectionTrait,
{
    if new_package.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Package name cannot be empty".to_string(),
        });
    }
    if !new_package.price.is_finite() || new_package.price < 0.0 {
        return Err(Error::InvalidAmount {
            amount: new_package.price,
        });
    }
    if new_package.duration <= 0 {
        return Err(Error::Validation {
            message: format!(
                "Package duration must be at least one day, got {}",
                new_package.duration
            ),
        });
    }

    package::ActiveModel {
        name: Set(new_package.name.trim().to_string()),
        speed: Set(new_package.speed),
        price: Set(new_package.price),
        duration: Set(new_package.duration),
        description: Set(new_package.description),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Adds a package to the catalog.
pub async fn add_package(
    db: &DatabaseConnection,
    actor: &Actor,
    new_package: NewPackage,
) -> Result<package::Model> {
    actor.require(Capability::ManageUsers)?;
    let created = insert_package(db, new_package).await?;
    info!(package = %created.name, price = created.price, duration = created.duration, "Added package");
    Ok(created)
}

/// Inserts the configured catalog when the packages table is empty.
///
/// Returns the number of packages inserted. The catalog is inserted as a whole:
/// one invalid entry leaves the table empty.
pub async fn seed_packages(db: &DatabaseConnection, catalog: &[PackageConfig]) -> Result<usize> {
    if Package::find().count(db).await? > 0 {
        return Ok(0);
    }

    let txn = db.begin().await?;
    for config in catalog {
        insert_package(&txn, NewPackage::from(config)).await?;
    }
    txn.commit().await?;
    info!("Seeded {} packages", catalog.len());
    Ok(catalog.len())
}
