//! Bot layer - Discord console for operators
//!
//! This module exposes the billing core as slash commands. Operators sign in with
//! `/login`; every command then runs as the [`Actor`] built from that account, so
//! permission checks and reseller scoping happen in the core, not here.

/// Discord command implementations (session, customer, billing, network, users, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    config::AppConfig,
    core::{Services, policy::Actor, user},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Router, messenger and ONU probe
    pub services: Services,
    /// Loaded application configuration
    pub config: AppConfig,
    /// Discord user id to signed-in operator id
    sessions: RwLock<HashMap<u64, i64>>,
}

impl BotData {
    #[must_use]
    pub fn new(database: DatabaseConnection, services: Services, config: AppConfig) -> Self {
        Self {
            database,
            services,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Binds a Discord user to an operator account.
    pub async fn sign_in(&self, discord_id: u64, user_id: i64) {
        self.sessions.write().await.insert(discord_id, user_id);
    }

    /// Returns whether a session existed.
    pub async fn sign_out(&self, discord_id: u64) -> bool {
        self.sessions.write().await.remove(&discord_id).is_some()
    }

    pub async fn session_user(&self, discord_id: u64) -> Option<i64> {
        self.sessions.read().await.get(&discord_id).copied()
    }
}

/// Context type used by every command.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// The actor for the command author, from their session.
///
/// Permissions are reloaded on every command so changes apply immediately.
pub async fn current_actor(ctx: Context<'_>) -> Result<Actor> {
    let data = ctx.data();
    let Some(user_id) = data.session_user(ctx.author().id.get()).await else {
        return Err(Error::Validation {
            message: "you are not signed in, use `/login` first".to_string(),
        });
    };
    user::actor_for_user_id(&data.database, user_id).await
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            let reply = if error.is_user_facing() {
                format!("❌ {error}")
            } else {
                error!("Error in command `{}`: {:?}", ctx.command().name, error);
                "❌ Something went wrong while running this command.".to_string()
            };
            if let Err(e) = ctx.say(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Builds the poise framework and runs the Discord client until it stops.
#[instrument(skip_all)]
pub async fn run_bot(
    token: String,
    database: DatabaseConnection,
    services: Services,
    config: AppConfig,
) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::login(),
                commands::logout(),
                commands::whoami(),
                commands::customers(),
                commands::customer_info(),
                commands::customer_add(),
                commands::customer_edit(),
                commands::customer_balance(),
                commands::recharge(),
                commands::customer_delete(),
                commands::history(),
                commands::dashboard(),
                commands::alerts(),
                commands::sweep(),
                commands::packages(),
                commands::package_add(),
                commands::message(),
                commands::inbox(),
                commands::message_read(),
                commands::message_delete(),
                commands::servers(),
                commands::server_add(),
                commands::server_edit(),
                commands::server_delete(),
                commands::server_check(),
                commands::onu_check(),
                commands::onu_status(),
                commands::users(),
                commands::user_add(),
                commands::permission_set(),
                commands::password_set(),
                commands::reseller_credit(),
                commands::reseller_refund(),
                commands::reseller_ledger(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Registered slash commands globally");
                Ok(BotData::new(database, services, config))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}

pub use commands::*;
pub use handlers::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_sessions_bind_discord_users() -> Result<()> {
        let db = setup_test_db().await?;
        let (services, _router) = test_services(&db);
        let data = BotData::new(db, services, AppConfig::default());

        assert_eq!(data.session_user(42).await, None);
        data.sign_in(42, 7).await;
        data.sign_in(43, 8).await;
        assert_eq!(data.session_user(42).await, Some(7));

        assert!(data.sign_out(42).await);
        assert!(!data.sign_out(42).await);
        assert_eq!(data.session_user(42).await, None);
        assert_eq!(data.session_user(43).await, Some(8));
        Ok(())
    }
}
