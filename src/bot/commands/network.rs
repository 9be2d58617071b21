//! Network Discord commands - Mikrotik router servers and ONU readings.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, current_actor, handlers::autocomplete},
        core::{
            customer, onu,
            policy::Capability,
            router::{self, NewServer, ServerUpdate},
        },
        errors::{Error, Result},
        models::ServerStatus,
    };
    use std::fmt::Write;

    /// Lists router servers with their customer counts.
    #[poise::command(slash_command, prefix_command)]
    pub async fn servers(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let db = &ctx.data().database;

        let servers = router::get_all_servers(db, &actor).await?;
        if servers.is_empty() {
            ctx.say("🖧 No router servers. Add one with `/server_add`.")
                .await?;
            return Ok(());
        }

        let mut response = String::from("🖧 **Router servers**\n\n");
        for s in &servers {
            let (total, active) = router::server_customer_counts(db, s.id).await?;
            writeln!(
                &mut response,
                "{} `#{}` **{}** {}:{} - {} customers ({} active)",
                if s.status == ServerStatus::Online.as_str() { "🟢" } else { "🔴" },
                s.id,
                s.name,
                s.host,
                s.port,
                total,
                active
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Registers a Mikrotik router server.
    #[poise::command(slash_command, prefix_command)]
    pub async fn server_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Display name"] name: String,
        #[description = "Host or IP address"] host: String,
        #[description = "API username"] username: String,
        #[description = "API password"] password: String,
        #[description = "API port (default 8728)"] port: Option<i32>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;

        let server = router::add_server(
            &ctx.data().database,
            &actor,
            NewServer {
                name,
                host,
                port: port.unwrap_or(8728),
                username,
                password,
            },
        )
        .await?;

        ctx.say(format!(
            "✅ Added server `#{}` **{}** ({}:{})",
            server.id, server.name, server.host, server.port
        ))
        .await?;
        Ok(())
    }

    /// Changes a router server's connection details. Omitted fields stay unchanged.
    #[poise::command(slash_command, prefix_command)]
    pub async fn server_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Server id"] server_id: i64,
        #[description = "Display name"] name: Option<String>,
        #[description = "Host or IP address"] host: Option<String>,
        #[description = "API port"] port: Option<i32>,
        #[description = "API username"] username: Option<String>,
        #[description = "API password"] password: Option<String>,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;

        let update = ServerUpdate {
            name,
            host,
            port,
            username,
            password,
        };
        let server = router::update_server(&ctx.data().database, &actor, server_id, update).await?;

        ctx.say(format!("✅ Updated server `#{}` **{}**", server.id, server.name))
            .await?;
        Ok(())
    }

    /// Removes a router server that has no customers.
    #[poise::command(slash_command, prefix_command)]
    pub async fn server_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Server id"] server_id: i64,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        router::delete_server(&ctx.data().database, &actor, server_id).await?;
        ctx.say(format!("🗑️ Deleted server `#{server_id}`")).await?;
        Ok(())
    }

    /// Pings a router server and records whether it is online.
    #[poise::command(slash_command, prefix_command)]
    pub async fn server_check(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Server id"] server_id: i64,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();
        ctx.defer().await?;

        let (server, ping) =
            router::check_server(&data.database, data.services.router.as_ref(), &actor, server_id)
                .await?;

        let mut response = match ping.latency_ms {
            Some(ms) if ping.success => format!("🟢 **{}** is online ({ms} ms)", server.name),
            _ => format!("🔴 **{}** did not answer", server.name),
        };
        if ping.success && actor.can(Capability::ManageServers) {
            let sessions = data.services.router.active_connections(server.id).await?;
            write!(&mut response, "\n👥 {sessions} active PPPoE sessions")?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Reads a fiber customer's ONU and stores the reading.
    #[poise::command(slash_command, prefix_command)]
    pub async fn onu_check(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Customer username"]
        #[autocomplete = "autocomplete::autocomplete_customer_username"]
        username: String,
    ) -> Result<()> {
        let actor = current_actor(ctx).await?;
        let data = ctx.data();
        ctx.defer().await?;

        let target = customer::get_customer_by_username(&data.database, &actor, &username).await?;
        let reading =
            onu::check_onu_status(&data.database, data.services.onu_probe.as_ref(), &actor, target.id)
                .await?;

        ctx.say(format!(
            "💡 **{}** ONU `{}`: {}\nRx {:.2} dBm ({}) | Tx {:.2} dBm | {:.0} °C | {} m",
            target.username,
            reading.onu_id,
            reading.status,
            reading.rx_power,
            onu::signal_quality(reading.rx_power),
            reading.tx_power,
            reading.temperature,
            reading.distance
        ))
        .await?;
        Ok(())
    }

    /// Lists the last stored ONU readings.
    #[poise::command(slash_command, prefix_command)]
    pub async fn onu_status(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let actor = current_actor(ctx).await?;
        actor.require(Capability::ViewCustomers)?;
        let db = &ctx.data().database;

        let readings = onu::get_all_onu_status(db).await?;
        let visible: Vec<String> = {
            let customers = customer::get_all_customers(db, &actor).await?;
            readings
                .iter()
                .filter(|r| customers.iter().any(|c| c.id == r.customer_id))
                .map(|r| {
                    format!(
                        "• `{}` {} - Rx {:.2} dBm ({}), updated {}",
                        r.onu_id,
                        r.status,
                        r.rx_power,
                        onu::signal_quality(r.rx_power),
                        r.last_update.format("%Y-%m-%d %H:%M")
                    )
                })
                .collect()
        };

        if visible.is_empty() {
            ctx.say("💡 No ONU readings yet. Use `/onu_check`.").await?;
        } else {
            ctx.say(format!("💡 **ONU readings**\n\n{}", visible.join("\n")))
                .await?;
        }
        Ok(())
    }
}

pub use inner::*;
