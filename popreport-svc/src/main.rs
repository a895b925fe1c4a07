//! popreport-svc - grading population report service
//!
//! `serve` runs the HTTP API; `import` loads a JSON array of raw records
//! into the database from the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use popreport_common::config::{CliOverrides, ConfigResolver, ServiceConfig};
use popreport_common::db::init_database;
use popreport_svc::service::{IngestMode, PopReportService};
use popreport_svc::store::{RecordStore, SqliteRecordStore};
use popreport_svc::{build_router, AppState};
use serde_json::Value;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "popreport-svc")]
#[command(about = "Grading population report service")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to the platform location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,

        /// Folder holding the database
        #[arg(long)]
        root_folder: Option<PathBuf>,

        /// Folder of static files served at /
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Import a JSON array of raw records
    Import {
        file: PathBuf,

        /// Keep existing records instead of replacing them
        #[arg(long)]
        append: bool,

        /// Folder holding the database
        #[arg(long)]
        root_folder: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = match &args.config {
        Some(path) => ConfigResolver::with_toml_path(path),
        None => ConfigResolver::new(),
    };

    let overrides = match &args.command {
        Command::Serve {
            bind,
            root_folder,
            static_dir,
        } => CliOverrides {
            root_folder: root_folder.clone(),
            bind: bind.clone(),
            static_assets: static_dir.clone(),
        },
        Command::Import { root_folder, .. } => CliOverrides {
            root_folder: root_folder.clone(),
            ..Default::default()
        },
    };

    let config = resolver.resolve(&overrides);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting popreport-svc v{}, root folder {}",
        env!("CARGO_PKG_VERSION"),
        config.root_folder.display()
    );

    match args.command {
        Command::Serve { .. } => serve(config).await,
        Command::Import { file, append, .. } => {
            let mode = if append {
                IngestMode::Append
            } else {
                IngestMode::Replace
            };
            import(config, &file, mode).await
        }
    }
}

async fn open_store(config: &ServiceConfig) -> Result<SqliteRecordStore> {
    config
        .ensure_root_folder()
        .context("Failed to create root folder")?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;
    Ok(SqliteRecordStore::new(pool))
}

async fn serve(config: ServiceConfig) -> Result<()> {
    let store = open_store(&config).await?;

    if config.access_password.is_none() {
        info!("No access password configured, API is open");
    }
    if let Some(dir) = &config.static_assets {
        info!("Serving static files from {}", dir.display());
    }

    let state = AppState::new(store, config.access_password.clone())
        .with_static_assets(config.static_assets.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!("popreport-svc listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn import(config: ServiceConfig, file: &Path, mode: IngestMode) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let raws: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of records", file.display()))?;
    info!("Read {} raw records from {}", raws.len(), file.display());

    let service = PopReportService::new(open_store(&config).await?);
    let summary = service.ingest(&raws, mode).await?;

    for sample in &summary.breakdown.samples {
        let reasons: Vec<&str> = sample.reasons.iter().map(|r| r.as_str()).collect();
        info!("Rejected record #{}: {}", sample.index, reasons.join(", "));
    }

    for (grade, count) in service.store().grade_distribution().await? {
        if count > 0 {
            info!("  grade {:>2}: {}", grade, count);
        }
    }
    info!(
        "Imported {} records ({} removed), {} in store",
        summary.inserted,
        summary.removed,
        service.store().count_all().await?
    );

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
