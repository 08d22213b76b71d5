use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trading_journal_api::app::{app, AppState};
use trading_journal_api::config::{self, StoreBackend};
use trading_journal_api::database::DatabaseManager;
use trading_journal_api::journal::{JournalStore, MemoryJournalStore, PgJournalStore};

#[derive(Parser)]
#[command(name = "trading-journal", version, about = "Trading journal API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listen port, overrides JOURNAL_API_PORT / PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::config();
    tracing::info!("Starting trading journal in {:?} mode", config.environment);

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Migrate => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            pool.close().await;
            Ok(())
        }
        Command::Serve { port } => serve(config, port).await,
    }
}

async fn serve(config: &config::AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let store: Arc<dyn JournalStore> = match config.journal.store {
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            Arc::new(PgJournalStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory journal store; data is lost on exit");
            Arc::new(MemoryJournalStore::new())
        }
    };

    let router = app(AppState::new(store, config), config);

    let bind_addr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Trading journal API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
