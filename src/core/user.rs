//! Operator account business logic - bootstrap, login, and account management.
//!
//! Capabilities are re-derived from the stored role and permission row every time an
//! [`Actor`] is built, so permission edits take effect on the operator's next command.

use crate::{
    core::{
        password::PasswordService,
        permissions,
        policy::{Actor, Capability, CapabilitySet, EmployeePermissions},
    },
    entities::{User, user},
    errors::{Error, Result},
    models::UserRole,
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

/// Creates the admin account if no admin exists yet.
///
/// Returns the admin user, either freshly created or already present.
pub async fn ensure_admin(db: &DatabaseConnection, password: &str) -> Result<user::Model> {
    if let Some(admin) = User::find()
        .filter(user::Column::Role.eq(UserRole::Admin.as_str()))
        .one(db)
        .await?
    {
        return Ok(admin);
    }

    let password_hash = PasswordService::new().hash_password(password)?;
    let admin = user::ActiveModel {
        username: Set("admin".to_string()),
        password_hash: Set(password_hash),
        role: Set(UserRole::Admin.as_str().to_string()),
        balance: Set(0.0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created admin account");
    Ok(admin)
}

/// Builds the actor for a stored user, loading employee permissions as needed.
pub async fn actor_for_user<C>(db: &C, user: &user::Model) -> Result<Actor>
where
    C: ConnectionTrait,
{
    let role = user.role()?;
    let capabilities = match role {
        UserRole::Admin => CapabilitySet::all(),
        UserRole::Employee => {
            let perms = permissions::get_employee_permissions(db, user.id).await?;
            CapabilitySet::for_employee(&perms)
        }
        UserRole::Reseller => CapabilitySet::reseller(),
        UserRole::System => {
            return Err(Error::Validation {
                message: "stored account has the reserved system role".to_string(),
            });
        }
    };

    Ok(Actor::new(
        Some(user.id),
        user.username.clone(),
        role,
        capabilities,
    ))
}

/// Builds the actor for a user id, failing if the account no longer exists.
pub async fn actor_for_user_id(db: &DatabaseConnection, user_id: i64) -> Result<Actor> {
    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;
    actor_for_user(db, &user).await
}

/// Checks credentials, returning the operator's actor on success.
///
/// Unknown usernames and wrong passwords both return `Ok(None)`.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<Actor>> {
    let Some(user) = get_user_by_username(db, username).await? else {
        return Ok(None);
    };

    if !PasswordService::new().verify_password(password, &user.password_hash)? {
        warn!(username, "Failed login attempt");
        return Ok(None);
    }

    actor_for_user(db, &user).await.map(Some)
}

/// Creates an employee or reseller account.
///
/// Resellers start with zero credit; employees get `permissions` or the defaults.
pub async fn create_user(
    db: &DatabaseConnection,
    actor: &Actor,
    username: &str,
    password: &str,
    role: UserRole,
    employee_permissions: Option<EmployeePermissions>,
) -> Result<user::Model> {
    actor.require(Capability::ManageUsers)?;

    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(Error::Validation {
            message: "username and password are required".to_string(),
        });
    }
    if !matches!(role, UserRole::Employee | UserRole::Reseller) {
        return Err(Error::Validation {
            message: format!("cannot create accounts with role '{role}'"),
        });
    }
    if get_user_by_username(db, username).await?.is_some() {
        return Err(Error::DuplicateUsername {
            username: username.to_string(),
        });
    }

    let password_hash = PasswordService::new().hash_password(password)?;

    let txn = db.begin().await?;
    let created = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        role: Set(role.as_str().to_string()),
        balance: Set(0.0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if role == UserRole::Employee {
        permissions::set_employee_permissions(
            &txn,
            created.id,
            &employee_permissions.unwrap_or_default(),
        )
        .await?;
    }
    txn.commit().await?;

    info!(username, %role, created_by = %actor.username, "Created operator account");
    Ok(created)
}

/// Retrieves all operator accounts ordered by username.
pub async fn get_all_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Username)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

pub async fn get_user_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Replaces the permission flags of an employee account.
pub async fn update_user_permissions(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
    employee_permissions: &EmployeePermissions,
) -> Result<()> {
    actor.require(Capability::ManageUsers)?;

    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;
    if user.role()? != UserRole::Employee {
        return Err(Error::Validation {
            message: format!("'{}' is not an employee", user.username),
        });
    }

    permissions::set_employee_permissions(db, user_id, employee_permissions).await?;
    info!(user = %user.username, updated_by = %actor.username, "Updated employee permissions");
    Ok(())
}

/// Changes an operator's password. Operators may change their own; admins anyone's.
pub async fn update_user_password(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
    new_password: &str,
) -> Result<()> {
    if actor.user_id != Some(user_id) {
        actor.require(Capability::ManageUsers)?;
    }
    if new_password.is_empty() {
        return Err(Error::Validation {
            message: "password cannot be empty".to_string(),
        });
    }

    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;

    let mut active_model: user::ActiveModel = user.into();
    active_model.password_hash = Set(PasswordService::new().hash_password(new_password)?);
    active_model.update(db).await?;
    Ok(())
}
