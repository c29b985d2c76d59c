//! CampusHub backend
//!
//! Main application entry point

use std::sync::Arc;
use tracing::info;

use campushub::{
    config::Settings,
    database::connection::{create_pool, run_migrations, DatabaseConfig},
    services::{NoopMailer, ServiceFactory},
    utils::clock::SystemClock,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging
    logging::init_logging(&settings.logging)?;

    info!("Starting CampusHub backend...");

    // Initialize database connection
    info!("Connecting to database...");
    let db_config = DatabaseConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        min_connections: settings.database.min_connections,
        ..DatabaseConfig::default()
    };
    let pool = create_pool(&db_config).await?;

    // Run database migrations
    run_migrations(&pool).await?;

    // Initialize services
    info!("Initializing services...");
    let clock = Arc::new(SystemClock);
    let services = ServiceFactory::new(pool, settings, Box::new(NoopMailer), clock);

    // Start the reminder scheduler
    let scheduler_handle = services.reminder_scheduler().start();

    info!("CampusHub backend is ready");

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping...");

    scheduler_handle.abort();

    info!("CampusHub backend has been shut down.");
    Ok(())
}
