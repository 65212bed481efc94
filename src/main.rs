use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;
use migration::Migrator;
use sea_orm::{ConnectOptions, Database};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::auth::ApiToken;
use crate::config::Config;
use crate::error::StartupError;
use crate::store::LocationStore;

mod auth;
mod config;
mod entity;
mod error;
mod routes;
mod store;

/// Shared, read-only request state.
#[derive(Debug, Clone)]
struct AppState {
    store: LocationStore,
    token: Arc<ApiToken>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| StartupError::Metrics(e.to_string()))?;
        info!(%addr, "Metrics exporter listening");
    }

    info!(database = %config.redacted_database_url(), "Connecting to database");
    let mut options = ConnectOptions::new(config.database_url.as_str());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .map_err(StartupError::Connection)?;
    db.ping().await.map_err(StartupError::Connection)?;
    info!("Database connection established");

    // Schema must be current before the listener binds.
    Migrator::run(&db).await?;

    let token = ApiToken::new(&config.api_token);
    info!(fingerprint = %token.fingerprint(), "API token loaded");

    let state = AppState {
        store: LocationStore::new(db),
        token: Arc::new(token),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.bind_addr,
            source,
        })?;
    info!(addr = %config.bind_addr, "Server listening");

    axum::serve(listener, app)
        .await
        .map_err(StartupError::Serve)
}
