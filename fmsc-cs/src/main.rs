//! fmsc-cs - Corrective session service
//!
//! Scores movement-screen profiles, triages them to a training tier and
//! returns a corrective session built from the exercise catalog.

use anyhow::{Context, Result};
use clap::Parser;
use fmsc_common::config::{CATALOG_ENV, CONFIG_ENV, DATABASE_ENV, PORT_ENV};
use fmsc_common::{candidates, rules, Catalog, CoachConfig};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fmsc_cs::catalog_store::CatalogStore;
use fmsc_cs::plan::build_plan_writer;
use fmsc_cs::{build_router, AppState};

/// Command-line arguments; each overrides the config file
#[derive(Parser, Debug)]
#[command(name = "fmsc-cs", version, about = "Movement-screen corrective session service")]
struct Args {
    /// Path to TOML configuration file
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// HTTP port
    #[arg(long, env = PORT_ENV)]
    port: Option<u16>,

    /// SQLite database path
    #[arg(long, env = DATABASE_ENV)]
    database: Option<PathBuf>,

    /// Exercise catalog JSON path
    #[arg(long, env = CATALOG_ENV)]
    catalog: Option<PathBuf>,
}

fn init_tracing(config: &CoachConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

/// Missing catalog file starts the service with an empty catalog
fn load_catalog(config: &CoachConfig) -> Result<Catalog> {
    if !config.catalog_path.exists() {
        warn!(
            "Catalog {} not found, starting with an empty catalog",
            config.catalog_path.display()
        );
        return Ok(Catalog::empty());
    }

    Catalog::load(&config.catalog_path)
        .with_context(|| format!("Failed to load catalog {}", config.catalog_path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Resolved before the subscriber exists; the origin is logged below
    let (mut config, origin) = CoachConfig::resolve_with_origin(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(catalog) = args.catalog {
        config.catalog_path = catalog;
    }

    init_tracing(&config)?;

    info!("Starting fmsc-cs (Corrective Session) v{}", env!("CARGO_PKG_VERSION"));
    origin.log();

    rules::validate().context("Scoring rule table failed validation")?;
    candidates::validate_fault_tags().context("Fault tag table failed validation")?;

    let catalog = load_catalog(&config)?;
    info!(
        entries = catalog.len(),
        vocabulary_version = catalog.vocabulary_version,
        "Catalog loaded"
    );

    info!("Database: {}", config.database_path.display());
    let db_pool = fmsc_cs::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let plan_writer = build_plan_writer(&config.plan_writer)?;
    info!("Plan writer: {}", plan_writer.name());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let store = CatalogStore::new(catalog, config.catalog_path.clone());
    let state = AppState::new(db_pool, store, config, plan_writer);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("fmsc-cs listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
