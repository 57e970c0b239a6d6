use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bloomwell::{api, config::Config, db::Database, models::Snapshot, schema};

#[derive(Parser)]
#[command(name = "bloomwell")]
#[command(about = "Storage and HTTP API for the Bloomwell habit garden")]
struct Cli {
    /// Database file (overrides BLOOMWELL_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (overrides BLOOMWELL_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Write every stored record to a JSON snapshot file
    Export { path: PathBuf },
    /// Replace all stored records with the contents of a JSON snapshot file
    Import { path: PathBuf },
    /// Print the JSON Schema of every record shape
    Schema,
}

/// Initialize tracing with output to stderr (when stdout carries output) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "bloomwell=debug,tower_http=debug".into()),
    );

    if use_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let path = config.database_path()?;
    tracing::debug!("Using database at {}", path.display());

    let db = Database::open(path)?;
    db.migrate()?;
    Ok(db)
}

async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let db = open_database(&config)?;
    if let Some(limiter) = &config.security.rate_limiter {
        limiter.spawn_pruning();
    }
    let app = api::create_router_with_config(db, config.security);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    tracing::info!("Bloomwell server listening on http://127.0.0.1:{}", port);

    // Connection info lets the rate limiter key on the peer address
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The schema goes to stdout, so logs must not
    let use_stderr = matches!(cli.command, Some(Commands::Schema));
    init_tracing(use_stderr);

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.port);
            serve(config, port).await?;
        }
        Some(Commands::Export { path }) => {
            let db = open_database(&config)?;
            let snapshot = db.export_snapshot()?;
            let json = serde_json::to_string_pretty(&snapshot)
                .context("Failed to serialize snapshot")?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                "Exported {} records to {}",
                snapshot.record_count(),
                path.display()
            );
        }
        Some(Commands::Import { path }) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let snapshot: Snapshot = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
            let db = open_database(&config)?;
            db.import_snapshot(snapshot)?;
        }
        Some(Commands::Schema) => {
            println!("{}", serde_json::to_string_pretty(&schema::document())?);
        }
        None => {
            let port = config.port;
            serve(config, port).await?;
        }
    }

    Ok(())
}
