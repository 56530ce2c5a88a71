//! RSVP server.
//!
//! Wires the Postgres document store, session-backed identity resolution and
//! the registration engine into the HTTP router, with Prometheus metrics on a
//! separate listener.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/rsvp \
//! RSVP_CANCELLATION_SECRET=change-me \
//! cargo run -p rsvp-server
//! ```

mod config;

use anyhow::Context;
use config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use rsvp_auth::{CancellationSigner, SessionIdentityResolver};
use rsvp_core::{Clock, DocumentStore, RandomQrHashGenerator, SystemClock};
use rsvp_engine::RsvpEnvironment;
use rsvp_postgres::PostgresDocumentStore;
use rsvp_web::{AppState, build_router};
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rsvp=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RSVP server");
    let config = Config::from_env();
    info!(
        list_page_size = config.rsvp.list_page_size,
        max_qr_attempts = config.rsvp.max_qr_attempts,
        "Configuration loaded"
    );
    if config.rsvp.uses_dev_secret() {
        warn!("RSVP_CANCELLATION_SECRET is not set; cancellation links use the development secret");
    }

    let metrics_addr: SocketAddr = config
        .metrics_address()
        .parse()
        .context("invalid METRICS_HOST/METRICS_PORT")?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    rsvp_engine::metrics::register_metrics();
    info!(%metrics_addr, "Metrics endpoint listening");

    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .connect(&config.postgres.url)
        .await
        .context("failed to connect to PostgreSQL")?;
    let postgres = PostgresDocumentStore::new(pool);
    postgres.migrate().await?;
    info!("Database migrations applied");

    let store: Arc<dyn DocumentStore> = Arc::new(postgres);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let signer = CancellationSigner::new(&config.rsvp.cancellation_secret)?;
    let env = RsvpEnvironment::new(
        store.clone(),
        clock.clone(),
        Arc::new(RandomQrHashGenerator),
        signer,
    )
    .with_config(config.rsvp.engine());
    let identities = Arc::new(SessionIdentityResolver::new(store, clock));

    let app = build_router(AppState::new(env, identities));

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), "HTTP server listening");

    let shutdown_started = Arc::new(Notify::new());
    let notify = shutdown_started.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            notify.notify_one();
        })
        .into_future();

    let grace = Duration::from_secs(config.server.shutdown_timeout);
    tokio::select! {
        result = server => result.context("server error")?,
        () = async {
            shutdown_started.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(timeout_secs = grace.as_secs(), "Shutdown timed out; dropping open connections");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Resolves on Ctrl+C, or SIGTERM on Unix. If a handler cannot be installed
/// that source is ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
