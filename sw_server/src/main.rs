//! Speed War server: sessions between a human participant and the
//! automated opponent, served over HTTP and WebSocket.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use log::info;
use pico_args::Arguments;
use speed_war::{
    DeckRepository, MemoryDeckRepository, PgDeckRepository, SessionManager, db::Database,
};
use sw_server::{api, config::ServerConfig};

const HELP: &str = "\
Run a Speed War game server

USAGE:
  sw_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string; decks stay in memory when unset
  SW_STORAGE               memory | postgres
  SW_SPEED                 relaxed | normal | fast
  SW_FLIP_INTERVAL_MS      Pause before each automated flip
  SW_SLAP_GRACE_MS         Time the human has to slap a match
  SW_AUTOMATED_SLAPS       Whether the automated participant slaps matches
  SW_SEED                  Seed for reproducible deals
  SW_MAX_CONSECUTIVE_FAILURES  Failed automated actions before a session is abandoned
  DB_MAX_CONNECTIONS       Connection pool size (PostgreSQL only)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    env_logger::builder().format_target(false).init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    info!(
        "Session pacing: flip every {} ms, slap grace {} ms, automated slaps {}",
        config.session.flip_interval_ms,
        config.session.slap_grace_ms,
        if config.session.automated_slaps { "on" } else { "off" }
    );

    let (repo, database): (Arc<dyn DeckRepository>, Option<Database>) = match &config.database {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

            let repo = PgDeckRepository::new(db.pool().clone());
            repo.ensure_schema()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to prepare deck schema: {}", e))?;

            info!("Database connected successfully");
            let repo: Arc<dyn DeckRepository> = Arc::new(repo);
            (repo, Some(db))
        }
        None => {
            info!("No database configured; decks are kept in memory");
            let repo: Arc<dyn DeckRepository> = Arc::new(MemoryDeckRepository::new());
            (repo, None)
        }
    };

    let session_manager = Arc::new(SessionManager::new(repo, config.session.clone()));

    let api_state = api::AppState {
        session_manager: session_manager.clone(),
        database: database.clone(),
    };
    let app = api::create_router(api_state);

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    session_manager.shutdown().await;
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
    }
}
