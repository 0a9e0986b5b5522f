//! Slot booking HTTP server.

use anyhow::Context;
use slot_booking_core::environment::SystemClock;
use slot_booking_postgres::PostgresBookingStore;
use slot_booking_redpanda::RedpandaTransport;
use slot_booking_runtime::metrics::MetricsServer;
use slot_booking_runtime::{BookingEngine, NotificationPublisher};
use slot_booking_server::{Config, DEFAULT_LOG_FILTER};
use slot_booking_web::{AppState, router};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    let filter = match config.server.log_level.as_deref() {
        Some(directives) => EnvFilter::try_new(directives).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting slot booking server");
    info!(
        database = %config.database.masked_url(),
        max_connections = config.database.max_connections,
        publishing = config.redpanda.publishing_enabled(),
        "Configuration loaded"
    );

    let pool = config
        .database
        .pool_config()
        .connect(&config.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let store = PostgresBookingStore::new(pool);
    store.migrate().await.context("Failed to run migrations")?;
    info!("Database ready");

    let publisher = if config.redpanda.publishing_enabled() {
        let transport = RedpandaTransport::builder()
            .brokers(&config.redpanda.brokers)
            .producer_acks(&config.redpanda.producer_acks)
            .build()
            .context("Failed to create Redpanda transport")?;
        info!(topic = %config.redpanda.topic, "Notification publishing enabled");
        NotificationPublisher::new(Arc::new(transport), &config.redpanda.topic)
    } else {
        warn!("REDPANDA_BROKERS or BOOKING_EVENTS_TOPIC not set; notifications are disabled");
        NotificationPublisher::disabled()
    };

    let mut metrics = MetricsServer::new();
    metrics.start().context("Failed to start metrics recorder")?;

    let engine = BookingEngine::new(Arc::new(store.clone()), publisher.clone(), Arc::new(SystemClock));
    let mut state = AppState::new(engine);
    if let Some(handle) = metrics.handle() {
        state = state.with_metrics(handle.clone());
    }

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(address = %address, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped, flushing notifications");
    if let Err(e) = publisher.shutdown(config.server.shutdown_timeout()).await {
        warn!(error = %e, "Exiting with notifications still in flight");
    }
    store.pool().close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
