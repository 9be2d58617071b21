use isp_billing::{
    bot,
    config::{self, database},
    core::{
        Services,
        messaging::DbMessenger,
        onu::SimulatedOnuProbe,
        package, user,
        router::SimulatedRouter,
    },
    errors::{Error, Result},
    scheduler,
};
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenvy::dotenv().ok();

    // 3. Load config.toml (built-in defaults when absent)
    let app_config = config::settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Connect and create tables
    std::fs::create_dir_all("data")?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    // 5. Bootstrap the admin account and the package catalog
    user::ensure_admin(&db, &config::users::get_admin_password()).await?;
    let seeded = package::seed_packages(&db, &app_config.packages).await?;
    if seeded > 0 {
        info!("Seeded {seeded} packages");
    }

    // 6. Wire external collaborators
    let services = Services::new(
        Arc::new(SimulatedRouter::from_settings(&app_config.router)),
        Arc::new(DbMessenger::new(db.clone())),
        Arc::new(SimulatedOnuProbe::default()),
    );

    // 7. Start the sweep scheduler
    tokio::spawn(scheduler::run_sweep_loop(
        db.clone(),
        services.clone(),
        app_config.billing.clone(),
    ));

    // 8. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, db, services, app_config).await
}
