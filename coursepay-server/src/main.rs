//! coursepay server
//!
//! Sells course access through a hosted-payment-page gateway and keeps
//! payment orders and enrollments reconciled.

#![forbid(unsafe_code)]

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use coursepay_core::gateway::{IpayGateway, TokenCache};
use coursepay_core::identity;
use coursepay_core::payments::PaymentService;
use coursepay_core::processors::StaleOrderSweeper;
use coursepay_core::store::PgStore;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// coursepay - payment orders and enrollments for a course platform
#[derive(Parser, Debug)]
#[command(name = "coursepay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "COURSEPAY_CONFIG", default_value = "./coursepay.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting coursepay-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    let gateway_config = loaded_config.gateway.clone();
    let checkout_config = loaded_config.checkout.clone();
    let sweeper_config = loaded_config.sweeper.clone();
    let identity = identity::from_config(&loaded_config.auth).map_err(|e| {
        tracing::error!("Failed to build identity provider: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let shared_config = loaded_config.into_shared();

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Gateway client with its token cache
    let tokens = Arc::new(TokenCache::new(gateway_config.token_margin));
    let gateway = Arc::new(IpayGateway::new(&gateway_config, tokens).map_err(|e| {
        tracing::error!("Failed to build gateway client: {}", e);
        e
    })?);

    let store = Arc::new(PgStore::new(db_pool.clone()));
    let payments = PaymentService::with_store(store, gateway, checkout_config);

    // Background sweeper for orders whose browser never came back
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = if sweeper_config.enabled {
        let sweeper = StaleOrderSweeper::new(payments.clone(), sweeper_config, shutdown_rx);
        Some(tokio::spawn(sweeper.run()))
    } else {
        tracing::info!("Stale order sweeper disabled");
        None
    };

    let state = AppState::new(payments, identity, shared_config);

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop background tasks
    shutdown_notify.notify_one();
    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper_handle
        && let Err(e) = handle.await
    {
        tracing::error!("Stale order sweeper task failed: {}", e);
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
