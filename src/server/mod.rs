pub mod app;
pub mod handlers;
pub mod middleware;

use anyhow::{Context, Result};
use clap::Subcommand;
use sea_orm_migration::prelude::*;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::database::{connection::*, migrations::Migrator};

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

pub async fn start_server(config: ServerConfig) -> Result<()> {
    let database_url = get_database_url(Some(&config.database));
    let db = establish_connection(&database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database))?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    if config.admin_token.is_none() {
        warn!("No admin token configured; write endpoints are open");
    }

    let addr = config.socket_addr();
    let app = app::create_app(db, config).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Aggregate health report");
    info!("  /health/simple              - Storage ping for load balancers");
    info!("  /health/ready, /health/live - Readiness and liveness probes");
    info!("  /api/v1/projects            - Projects, layer tree and default layers");
    info!("  /api/v1/layer-groups        - Layer groups");
    info!("  /api/v1/layers              - Layers");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (drop all, then up)");
            Migrator::fresh(&db).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
