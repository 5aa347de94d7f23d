//! `recordsd`: the school records server binary.
//!
//! Usage:
//!   recordsd [serve] [--data-dir DIR] [--db PATH] [--listen ADDR]
//!   recordsd backup export --out bundle.zip
//!   recordsd backup import --in bundle.zip

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use recordsd::api::{build_router, AppState};
use recordsd::config::{ServiceConfig, DEFAULT_DATA_DIR, DEFAULT_LISTEN};
use recordsd::{backup, db};

#[derive(Parser, Debug)]
#[command(name = "recordsd", about = "School records server", version)]
struct Cli {
    /// Directory holding the records database.
    #[arg(long, env = "RECORDS_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    /// Database file (overrides `{data-dir}/records.sqlite3`).
    #[arg(long = "db", env = "RECORDS_DB", global = true)]
    db: Option<PathBuf>,

    /// Listen address for the HTTP server.
    #[arg(long, env = "RECORDS_LISTEN", default_value = DEFAULT_LISTEN, global = true)]
    listen: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Export or restore the records database.
    #[command(subcommand)]
    Backup(BackupCommand),
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
    /// Write a zip bundle of the database.
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    /// Replace the database with the contents of a bundle.
    Import {
        #[arg(long = "in")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig {
        data_dir: cli.data_dir,
        db_path: cli.db,
        listen: cli.listen,
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Backup(BackupCommand::Export { out }) => {
            let summary = backup::export_bundle(&config.resolve_db_path(), &out)?;
            info!(
                out = %out.display(),
                format = %summary.bundle_format,
                sha256 = %summary.db_sha256,
                "backup exported"
            );
            Ok(())
        }
        Command::Backup(BackupCommand::Import { input }) => {
            let db_path = config.resolve_db_path();
            let summary = backup::import_bundle(&input, &db_path)?;
            info!(
                db = %db_path.display(),
                format = %summary.bundle_format_detected,
                "backup imported"
            );
            Ok(())
        }
    }
}

async fn serve(config: &ServiceConfig) -> anyhow::Result<()> {
    let db_path = config.resolve_db_path();
    let conn = db::open_db(&db_path)?;
    info!("Records database at {}", db_path.display());

    let app = build_router(AppState::new(conn));

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!("recordsd listening on {}", config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("recordsd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
