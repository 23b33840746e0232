use anyhow::Result;
use log::{info, warn};
use siskamling::api::rest::{AppState, RestApi};
use siskamling::config;
use siskamling::db::DatabaseService;
use siskamling::messaging::{create_notification_bus, EventMessage, EventType};
use siskamling::services::{AlertLedger, IncidentLog, PatrolLedger, StatsEngine};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();
    info!("Starting siskamling security service");

    // Optional config file as first argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;
    info!("Configuration loaded");

    // Database pool and migrations
    let database = Arc::new(DatabaseService::new(&config.database).await?);

    // Fan-out bus for dashboard sessions
    let bus = create_notification_bus(&config.notification_bus);

    // Ledgers own all mutation; dashboards only hold projections.
    // Geolocation and evidence uploads happen client-side in the portal, so
    // no collaborator implementations are wired here; submissions arrive
    // with coordinates and photo URLs already attached.
    let alerts = Arc::new(AlertLedger::new(database.pool.clone(), bus.clone()));
    let patrol = Arc::new(PatrolLedger::new(database.pool.clone(), bus.clone()));
    let incidents = Arc::new(IncidentLog::new(database.pool.clone(), bus.clone()));
    let stats = Arc::new(StatsEngine::new(database.pool.clone()));

    match EventMessage::new(
        EventType::SystemStartup,
        None,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }),
    ) {
        Ok(event) => {
            bus.publish(event);
        }
        Err(e) => warn!("Failed to publish startup event: {}", e),
    }

    let api = RestApi::new(
        &config.api,
        AppState {
            alerts,
            patrol,
            incidents,
            stats,
            bus: bus.clone(),
            database,
        },
    );

    // Serves until ctrl-c
    api.run().await?;

    bus.publish(EventMessage::new_empty(EventType::SystemShutdown, None));
    info!("Shutting down");

    Ok(())
}
