//! Customer Discord commands - listing, creation, balance changes and removal.
//!
//! Customers are addressed by username. Lookups go through the core with the
//! operator's actor, so resellers only ever reach their own customers.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, current_actor, handlers::autocomplete},
        core::{
            customer::{self, CreateOptions, CustomerUpdate, NewCustomer},
            ledger, package,
        },
        entities::customer::Model as Customer,
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Lines shown by list commands before truncating.
    const LIST_LIMIT: usize = 30;

    fn status_emoji(customer: &Customer) -> &'static str {
        if customer.is_active() { "🟢" } else { "🔴" }
    }

    async fn package_id_by_name(db: &sea_orm::DatabaseConnection, name: &str) -> Result<i64> {
        package::get_package_by_name(db, name)
            .await?
            .map(|p| p.id)
            .ok_or_else(|| Error::PackageNotFound {
                id: name.to_string(),
            })
    }

    /// Lists the customers you can see.
    #[poise::command(slash_command, prefix_command)]
    pub async fn customers(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let customers = customer::get_all_customers(&ctx.data().database, &actor).await?;

        if customers.is_empty() {
            ctx.say("👥 No customers yet. Add one with `/customer_add`.")
                .await?;
            return Ok(());
        }

        let mut response = format!("👥 **Customers ({})**\n\n", customers.len());
        for c in customers.iter().take(LIST_LIMIT) {
            writeln!(
                &mut response,
                "{} **{}** - {} | {} | balance {:.2}",
                status_emoji(c),
                c.username,
                c.full_name,
                c.package_name,
                c.balance
            )?;
        }
        if customers.len() > LIST_LIMIT {
            writeln!(&mut response, "… and {} more", customers.len() - LIST_LIMIT)?;
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Shows the details of one customer.
    #[poise::command(slash_command, prefix_command)]
    pub async fn customer_info(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Customer username"]
        #[autocomplete = "autocomplete::autocomplete_customer_username"]
        username: String,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let c = customer::get_customer_by_username(&ctx.data().database, &actor, &username).await?;

        let mut response = format!("📋 **{}** ({})\n\n", c.full_name, c.username);
        writeln!(&mut response, "{} Status: {}", status_emoji(&c), c.status)?;
        writeln!(&mut response, "💰 Balance: {:.2}", c.balance)?;
        writeln!(&mut response, "📦 Package: {}", c.package_name)?;
        writeln!(&mut response, "📞 Phone: {}", c.phone)?;
        if let Some(email) = &c.email {
            writeln!(&mut response, "✉️ Email: {email}")?;
        }
        writeln!(&mut response, "🏠 Address: {}", c.address)?;
        writeln!(&mut response, "🖧 Router server: #{}", c.server_id)?;
        if let Some(onu_id) = &c.onu_id {
            writeln!(&mut response, "💡 ONU: {onu_id}")?;
        }
        if let Some(due) = c.bill_due_date {
            writeln!(&mut response, "📅 Bill due: {}", due.format("%Y-%m-%d"))?;
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Creates a customer, funds the opening balance and provisions the PPPoE secret.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, prefix_command)]
    pub async fn customer_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "PPPoE username"] username: String,
        #[description = "PPPoE password"] password: String,
        #[description = "Full name"] full_name: String,
        #[description = "Phone number"] phone: String,
        #[description = "Address"] address: String,
        #[description = "Package"]
        #[autocomplete = "autocomplete::autocomplete_package_name"]
        package_name: String,
        #[description = "Opening balance (default 0)"] initial_balance: Option<f64>,
        #[description = "Email address"] email: Option<String>,
        #[description = "ONU id for fiber customers"] onu_id: Option<String>,
        #[description = "Router server id (default: first server)"] server_id: Option<i64>,
        #[description = "Send the credentials notice (default true)"] send_credentials: Option<bool>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();
        ctx.defer().await?;

        let package_id = package_id_by_name(&data.database, &package_name).await?;
        let new_customer = NewCustomer {
            username,
            password,
            full_name,
            phone,
            email,
            address,
            package_id,
            initial_balance: initial_balance.unwrap_or(0.0),
            server_id,
            onu_id,
            ..Default::default()
        };
        let options = CreateOptions {
            send_credentials: send_credentials.unwrap_or(true),
            ..Default::default()
        };

        let created =
            customer::create_customer(&data.database, &data.services, &actor, new_customer, options)
                .await?;

        ctx.say(format!(
            "✅ Created customer **{}** on {} with balance {:.2} ({})",
            created.username, created.package_name, created.balance, created.status
        ))
        .await?;
        Ok(())
    }

    /// Updates a customer's profile. Omitted fields stay unchanged.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, prefix_command)]
    pub async fn customer_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Customer username"]
        #[autocomplete = "autocomplete::autocomplete_customer_username"]
        username: String,
        #[description = "Full name"] full_name: Option<String>,
        #[description = "Phone number"] phone: Option<String>,
        #[description = "Email address"] email: Option<String>,
        #[description = "Address"] address: Option<String>,
        #[description = "Package"]
        #[autocomplete = "autocomplete::autocomplete_package_name"]
        package_name: Option<String>,
        #[description = "ONU id"] onu_id: Option<String>,
        #[description = "Renew automatically"] auto_renew: Option<bool>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;

        let target = customer::get_customer_by_username(db, &actor, &username).await?;
        let package_id = match package_name {
            Some(name) => Some(package_id_by_name(db, &name).await?),
            None => None,
        };
        let update = CustomerUpdate {
            full_name,
            phone,
            email,
            address,
            package_id,
            onu_id,
            auto_renew,
            ..Default::default()
        };

        let updated = customer::update_customer_profile(db, &actor, target.id, update).await?;
        ctx.say(format!("✅ Updated customer **{}**", updated.username))
            .await?;
        Ok(())
    }

    /// Sets a customer's balance to an exact value.
    #[poise::command(slash_command, prefix_command)]
    pub async fn customer_balance(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Customer username"]
        #[autocomplete = "autocomplete::autocomplete_customer_username"]
        username: String,
        #[description = "New balance"] balance: f64,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();

        let target = customer::get_customer_by_username(&data.database, &actor, &username).await?;
        let change =
            customer::update_customer_balance(&data.database, &data.services, &actor, target.id, balance)
                .await?;

        ctx.say(format!(
            "✅ **{}**: {:.2} → {:.2} ({})",
            change.customer.username,
            change.previous_balance,
            change.customer.balance,
            change.customer.status
        ))
        .await?;
        Ok(())
    }

    /// Adds an amount to a customer's balance.
    #[poise::command(slash_command, prefix_command)]
    pub async fn recharge(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Customer username"]
        #[autocomplete = "autocomplete::autocomplete_customer_username"]
        username: String,
        #[description = "Amount to add"] amount: f64,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();

        let target = customer::get_customer_by_username(&data.database, &actor, &username).await?;
        let change =
            customer::recharge_customer(&data.database, &data.services, &actor, target.id, amount)
                .await?;

        let mut response = format!(
            "💰 Recharged **{}** by {:.2}. New balance: {:.2}",
            change.customer.username, amount, change.customer.balance
        );
        if change.flipped_active() {
            response.push_str("\n🟢 Service re-enabled.");
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Removes a customer and their PPPoE secret. The balance ledger is kept.
    #[poise::command(slash_command, prefix_command)]
    pub async fn customer_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Customer username"]
        #[autocomplete = "autocomplete::autocomplete_customer_username"]
        username: String,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();

        let target = customer::get_customer_by_username(&data.database, &actor, &username).await?;
        customer::delete_customer(&data.database, &data.services, &actor, target.id).await?;

        ctx.say(format!("🗑️ Deleted customer **{}**", target.username))
            .await?;
        Ok(())
    }

    /// Shows a customer's recent balance ledger entries.
    #[poise::command(slash_command, prefix_command)]
    pub async fn history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Customer username"]
        #[autocomplete = "autocomplete::autocomplete_customer_username"]
        username: String,
        #[description = "Number of entries (default 10)"] limit: Option<u32>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;

        let target = customer::get_customer_by_username(db, &actor, &username).await?;
        let entries = ledger::get_customer_transactions(db, &actor, target.id).await?;

        if entries.is_empty() {
            ctx.say(format!("📜 No ledger entries for **{}**.", target.username))
                .await?;
            return Ok(());
        }

        let mut response = format!("📜 **Ledger for {}**\n\n", target.username);
        for entry in entries.iter().take(limit.map_or(10, |n| n as usize)) {
            writeln!(
                &mut response,
                "`{}` {} {:.2} → {:.2} - {} (by {})",
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.transaction_type,
                entry.amount,
                entry.balance,
                entry.description,
                entry.created_by
            )?;
        }

        ctx.say(response).await?;
        Ok(())
    }
}

pub use inner::*;
