//! Session commands - `login`, `logout` and `whoami`.
//!
//! A session binds the Discord author to an operator account for the lifetime of
//! the bot process.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, current_actor},
        core::{policy::Capability, user},
        errors::{Error, Result},
    };

    /// Signs in to an operator account.
    #[poise::command(slash_command, ephemeral)]
    pub async fn login(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Operator username"] username: String,
        #[description = "Password"] password: String,
    ) -> Result<()> {
        let data = ctx.data();

        let Some(actor) = user::authenticate(&data.database, &username, &password).await? else {
            ctx.say("❌ Invalid username or password.").await?;
            return Ok(());
        };
        let Some(user_id) = actor.user_id else {
            ctx.say("❌ This account cannot sign in.").await?;
            return Ok(());
        };

        data.sign_in(ctx.author().id.get(), user_id).await;
        ctx.say(format!(
            "✅ Signed in as **{}** ({}).",
            actor.username, actor.role
        ))
        .await?;
        Ok(())
    }

    /// Ends the current session.
    #[poise::command(slash_command, ephemeral)]
    pub async fn logout(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        if ctx.data().sign_out(ctx.author().id.get()).await {
            ctx.say("👋 Signed out.").await?;
        } else {
            ctx.say("ℹ️ You were not signed in.").await?;
        }
        Ok(())
    }

    /// Shows the signed-in account and its permissions.
    #[poise::command(slash_command, prefix_command, ephemeral)]
    pub async fn whoami(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let permissions: Vec<&str> = actor.capabilities().iter().map(Capability::as_str).collect();

        ctx.say(format!(
            "👤 **{}** ({})\nPermissions: {}",
            actor.username,
            actor.role,
            if permissions.is_empty() {
                "none".to_string()
            } else {
                permissions.join(", ")
            }
        ))
        .await?;
        Ok(())
    }
}

pub use inner::*;
