// Banco de Alimentos - Web Server
// REST API over the beneficiary registry

use anyhow::{Context, Result};
use banco_alimentos::{
    create_router, init_tracing, AppConfig, AppState, BeneficiarioController, Database,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments for the API server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite database file (":memory:" for a throwaway database)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    init_tracing(&config.log_level).context("Failed to initialise logging")?;

    if config.is_in_memory() {
        warn!("using an in-memory database; data is lost on shutdown");
    }

    let db = Database::open(&config.database_path).with_context(|| {
        format!("Failed to open database at {}", config.database_path.display())
    })?;

    let app = create_router(AppState::new(BeneficiarioController::new(db)));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server listening");
    info!("API: http://{}/beneficiarios", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
