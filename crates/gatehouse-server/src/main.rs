//! Gatehouse bootstrap: connect, migrate, seed, and report on the graph.

mod settings;

use anyhow::Result;
use gatehouse_db::{DbManager, SurrealStore, run_migrations};
use gatehouse_service::{AccessReporter, OrphanReporter, SeedOutcome, Seeder};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.logging.level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    tracing::info!("Starting Gatehouse...");

    let manager = DbManager::connect(&settings.db_config()).await?;
    let db = manager.client().clone();
    run_migrations(&db).await?;
    let store = SurrealStore::new(db);

    if settings.service.seed.enabled {
        match Seeder::new(store.clone(), settings.service_config())
            .seed_defaults()
            .await?
        {
            SeedOutcome::Seeded(summary) => tracing::info!(
                admin_id = %summary.admin_id,
                modules = summary.modules,
                permissions = summary.permissions,
                "Seeded default data"
            ),
            SeedOutcome::Skipped => tracing::info!("Existing data found, seed skipped"),
        }
    }

    let orphans = OrphanReporter::new(store.clone()).orphan_report().await?;
    if orphans.is_clean() {
        tracing::info!("No orphaned entities");
    } else {
        tracing::warn!(
            summary = %serde_json::to_string(&orphans.summary)?,
            total = orphans.summary.total(),
            "Orphaned entities found"
        );
    }

    let overview = AccessReporter::new(store).system_overview().await?;
    tracing::info!(
        counts = %serde_json::to_string(&overview.counts)?,
        permissions_by_module = %serde_json::to_string(&overview.permissions_by_module)?,
        "System overview"
    );

    tracing::info!("Gatehouse bootstrap complete.");
    Ok(())
}
