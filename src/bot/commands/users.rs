//! Administration Discord commands - operator accounts, employee permissions and
//! reseller credit.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, current_actor, handlers::autocomplete},
        core::{
            ledger, permissions,
            policy::{Capability, CapabilitySet, EmployeePermissions},
            user,
        },
        entities::user::Model as Operator,
        errors::{Error, Result},
        models::UserRole,
    };
    use std::{collections::HashMap, fmt::Write};

    async fn operator_by_name(db: &sea_orm::DatabaseConnection, username: &str) -> Result<Operator> {
        user::get_user_by_username(db, username)
            .await?
            .ok_or_else(|| Error::UserNotFound {
                id: username.to_string(),
            })
    }

    fn granted(perms: &EmployeePermissions) -> String {
        let names: Vec<&str> = CapabilitySet::for_employee(perms)
            .iter()
            .map(Capability::as_str)
            .collect();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    }

    /// Lists operator accounts.
    #[poise::command(slash_command, prefix_command)]
    pub async fn users(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = current_actor(ctx).await?;
        actor.require(Capability::ManageUsers)?;
        let db = &ctx.data().database;

        let accounts = user::get_all_users(db).await?;
        let perms: HashMap<i64, EmployeePermissions> =
            permissions::get_all_permissions(db).await?.into_iter().collect();

        let mut response = String::from("🧑‍💼 **Operators**\n\n");
        for account in &accounts {
            write!(&mut response, "• **{}** ({})", account.username, account.role)?;
            match account.role()? {
                UserRole::Reseller => {
                    write!(&mut response, " - credit {:.2}", account.balance)?;
                }
                UserRole::Employee => {
                    let employee = perms.get(&account.id).copied().unwrap_or_default();
                    write!(&mut response, " - {}", granted(&employee))?;
                }
                UserRole::Admin | UserRole::System => {}
            }
            response.push('\n');
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Creates an employee or reseller account.
    #[poise::command(slash_command, prefix_command, ephemeral)]
    pub async fn user_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Username"] username: String,
        #[description = "Initial password"] password: String,
        #[description = "Role: employee or reseller"] role: String,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let role: UserRole = role.parse()?;

        let created =
            user::create_user(&ctx.data().database, &actor, &username, &password, role, None)
                .await?;

        ctx.say(format!(
            "✅ Created {} account **{}**",
            created.role, created.username
        ))
        .await?;
        Ok(())
    }

    /// Grants or revokes one permission of an employee.
    #[poise::command(slash_command, prefix_command)]
    pub async fn permission_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Employee username"]
        #[autocomplete = "autocomplete::autocomplete_operator_username"]
        username: String,
        #[description = "Permission, e.g. edit_balance"] permission: String,
        #[description = "Grant (true) or revoke (false)"] enabled: bool,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;
        let capability: Capability = permission.parse()?;

        let employee = operator_by_name(db, &username).await?;
        let mut perms = permissions::get_employee_permissions(db, employee.id).await?;
        perms.set(capability, enabled)?;
        user::update_user_permissions(db, &actor, employee.id, &perms).await?;

        ctx.say(format!(
            "✅ **{}** now has: {}",
            employee.username,
            granted(&perms)
        ))
        .await?;
        Ok(())
    }

    /// Changes your password, or another operator's when you manage users.
    #[poise::command(slash_command, ephemeral)]
    pub async fn password_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "New password"] new_password: String,
        #[description = "Operator (default: yourself)"]
        #[autocomplete = "autocomplete::autocomplete_operator_username"]
        username: Option<String>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;

        let target_id = match username {
            Some(name) => operator_by_name(db, &name).await?.id,
            None => actor.user_id.ok_or_else(|| Error::Validation {
                message: "no operator account to update".to_string(),
            })?,
        };
        user::update_user_password(db, &actor, target_id, &new_password).await?;

        ctx.say("🔑 Password updated.").await?;
        Ok(())
    }

    /// Adds prepaid credit to a reseller.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reseller_credit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Reseller username"]
        #[autocomplete = "autocomplete::autocomplete_operator_username"]
        username: String,
        #[description = "Amount to add"] amount: f64,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;

        let reseller = operator_by_name(db, &username).await?;
        let entry = ledger::add_reseller_credit(db, &actor, reseller.id, amount).await?;

        ctx.say(format!(
            "💳 Added {:.2} credit to **{}**. Balance: {:.2}",
            entry.amount, entry.reseller_name, entry.balance
        ))
        .await?;
        Ok(())
    }

    /// Refunds credit to a reseller.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reseller_refund(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Reseller username"]
        #[autocomplete = "autocomplete::autocomplete_operator_username"]
        username: String,
        #[description = "Amount to refund"] amount: f64,
        #[description = "Reason"] reason: String,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;

        let reseller = operator_by_name(db, &username).await?;
        let entry = ledger::refund_reseller_credit(db, &actor, reseller.id, amount, &reason).await?;

        ctx.say(format!(
            "↩️ Refunded {:.2} to **{}**. Balance: {:.2}",
            entry.amount, entry.reseller_name, entry.balance
        ))
        .await?;
        Ok(())
    }

    /// Shows a reseller's credit ledger. Resellers see their own by default.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reseller_ledger(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Reseller username (default: yourself)"]
        #[autocomplete = "autocomplete::autocomplete_operator_username"]
        username: Option<String>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;

        let entries = match username {
            Some(name) => {
                let reseller = operator_by_name(db, &name).await?;
                ledger::get_reseller_transactions(db, &actor, reseller.id).await?
            }
            None if actor.role == UserRole::Reseller => {
                let own = actor.user_id.ok_or_else(|| Error::Validation {
                    message: "no reseller account".to_string(),
                })?;
                ledger::get_reseller_transactions(db, &actor, own).await?
            }
            None => ledger::get_all_reseller_transactions(db, &actor).await?,
        };

        if entries.is_empty() {
            ctx.say("💳 No reseller credit entries.").await?;
            return Ok(());
        }

        let mut response = String::from("💳 **Reseller credit**\n\n");
        for entry in entries.iter().take(20) {
            writeln!(
                &mut response,
                "`{}` **{}** {} {:.2} → {:.2} - {}",
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.reseller_name,
                entry.transaction_type,
                entry.amount,
                entry.balance,
                entry.description
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }
}

pub use inner::*;
