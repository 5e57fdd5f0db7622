use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use visor::config::ServerConfig;
use visor::server;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        /// YAML configuration file
        #[clap(short, long)]
        config: Option<PathBuf>,
        #[clap(short, long)]
        port: Option<u16>,
        #[clap(short, long)]
        database: Option<String>,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long, default_value = "visor.db")]
        database: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    setup_logging(&args.log_level);

    match args.command {
        Commands::Serve {
            config,
            port,
            database,
            cors_origin,
        } => {
            let mut config = ServerConfig::load(config.as_deref())?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(database) = database {
                config.database = database;
            }
            if cors_origin.is_some() {
                config.cors_origin = cors_origin;
            }

            info!("Starting server on {}", config.socket_addr());
            server::start_server(config).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Migrate {
                direction,
                database,
            } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&database, direction).await?;
            }
        },
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_deref()
        .unwrap_or("info")
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlx=warn,{}", log_level)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
