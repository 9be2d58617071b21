//! Billing Discord commands - dashboard, alerts, the sweep, packages and messages.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, current_actor, handlers::autocomplete},
        core::{
            customer, messaging,
            package::{self, NewPackage},
            report,
            sweep::{self, SweepSettings},
        },
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Shows customer counts, revenue and pending alerts.
    #[poise::command(slash_command, prefix_command)]
    pub async fn dashboard(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();

        let stats = report::dashboard_stats(
            &data.database,
            &actor,
            data.config.billing.alert_threshold_days,
            chrono::Utc::now(),
        )
        .await?;

        ctx.say(format!(
            "📊 **Dashboard**\n```\n{}\n```",
            report::format_dashboard(&stats)?
        ))
        .await?;
        Ok(())
    }

    /// Lists active customers with only a few days of service left.
    #[poise::command(slash_command, prefix_command)]
    pub async fn alerts(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();
        let threshold = data.config.billing.alert_threshold_days;

        let needing = customer::customers_needing_alert(&data.database, &actor, threshold).await?;
        if needing.is_empty() {
            ctx.say(format!(
                "✅ No customers within {threshold} days of running out."
            ))
            .await?;
            return Ok(());
        }

        let mut response = format!("⚠️ **{} customer(s) running low**\n\n", needing.len());
        for (c, days) in &needing {
            writeln!(
                &mut response,
                "• **{}** ({}) - balance {:.2}, {} day(s) left",
                c.username, c.phone, c.balance, days
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Runs the daily auto-deduction sweep now.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sweep(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();

        // Acknowledge command quickly
        ctx.defer().await?;

        let report = sweep::process_auto_deductions(
            &data.database,
            &data.services,
            &actor,
            &SweepSettings::from(&data.config.billing),
            chrono::Utc::now(),
        )
        .await?;

        ctx.say(format!(
            "✅ **Sweep complete**\n```\n{}\n```",
            sweep::format_sweep_summary(&report)?
        ))
        .await?;
        Ok(())
    }

    /// Lists the package catalog.
    #[poise::command(slash_command, prefix_command)]
    pub async fn packages(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let packages = package::get_all_packages(&ctx.data().database).await?;
        if packages.is_empty() {
            ctx.say("📦 No packages configured.").await?;
            return Ok(());
        }

        let mut response = String::from("📦 **Packages**\n\n");
        for p in &packages {
            writeln!(
                &mut response,
                "• **{}** ({}) - {:.2} / {} days. {}",
                p.name, p.speed, p.price, p.duration, p.description
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Adds a package to the catalog.
    #[poise::command(slash_command, prefix_command)]
    pub async fn package_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Package name"] name: String,
        #[description = "Router rate limit, e.g. 10M/10M"] speed: String,
        #[description = "Price per period"] price: f64,
        #[description = "Period length in days (default 30)"] duration: Option<i32>,
        #[description = "Description"] description: Option<String>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;

        let created = package::add_package(
            &ctx.data().database,
            &actor,
            NewPackage {
                name,
                speed,
                price,
                duration: duration.unwrap_or(30),
                description: description.unwrap_or_default(),
            },
        )
        .await?;

        ctx.say(format!(
            "✅ Added package **{}** at {:.2} / {} days",
            created.name, created.price, created.duration
        ))
        .await?;
        Ok(())
    }

    /// Sends a general message to a customer.
    #[poise::command(slash_command, prefix_command)]
    pub async fn message(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Customer username"]
        #[autocomplete = "autocomplete::autocomplete_customer_username"]
        username: String,
        #[description = "Subject"] subject: String,
        #[description = "Message body"] body: String,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;

        let target = customer::get_customer_by_username(db, &actor, &username).await?;
        let sent = messaging::send_general_message(db, &actor, target.id, &subject, &body).await?;

        ctx.say(format!(
            "✉️ Message #{} sent to **{}**",
            sent.id, target.username
        ))
        .await?;
        Ok(())
    }

    /// Shows recent customer messages, newest first.
    #[poise::command(slash_command, prefix_command)]
    pub async fn inbox(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Number of messages (default 15)"] limit: Option<u32>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let messages = messaging::get_all_messages(&ctx.data().database, &actor).await?;

        if messages.is_empty() {
            ctx.say("📭 No messages.").await?;
            return Ok(());
        }

        let mut response = String::from("📬 **Messages**\n\n");
        for m in messages.iter().take(limit.map_or(15, |n| n as usize)) {
            writeln!(
                &mut response,
                "{} `#{}` [{}] **{}** → {}: {}",
                if m.is_read { "📖" } else { "🆕" },
                m.id,
                m.message_type,
                m.subject,
                m.customer_name,
                m.sent_at.format("%Y-%m-%d %H:%M")
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Marks a message as read.
    #[poise::command(slash_command, prefix_command)]
    pub async fn message_read(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Message id"] message_id: i64,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        messaging::mark_as_read(&ctx.data().database, &actor, message_id).await?;
        ctx.say(format!("📖 Message #{message_id} marked as read"))
            .await?;
        Ok(())
    }

    /// Deletes a message.
    #[poise::command(slash_command, prefix_command)]
    pub async fn message_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Message id"] message_id: i64,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        messaging::delete_message(&ctx.data().database, &actor, message_id).await?;
        ctx.say(format!("🗑️ Deleted message #{message_id}")).await?;
        Ok(())
    }
}

pub use inner::*;
