//! Order service - HTTP intake bridging order submissions to RabbitMQ.
//!
//! This binary wires together the configuration, the publisher and the HTTP
//! router. Order submissions and the broker readiness probe publish through
//! one shared, reconnecting connection; all parsing and fulfilment happens
//! in downstream consumers.

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use order_service::web::{router, AppState};
use order_service::{Config, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("order_service_starting");

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        port = config.port,
        queue = %config.order_queue,
        durable_queue = config.durable_queue,
        broker_timeout_ms = config.broker_timeout_ms,
        "config_loaded"
    );

    // Create the RabbitMQ publisher and connect eagerly so the first request
    // does not pay for the handshake. Publishing reconnects on demand, so a
    // failure here is not fatal; the readiness probe reports broker state.
    let publisher = Publisher::new(&config);
    if let Err(e) = publisher.connect().await {
        warn!(error = %e, "rabbitmq_initial_connect_failed");
    }

    // Create application state and build the router
    let state = AppState::new(config.clone(), publisher.clone());
    let app = router(state).layer(TraceLayer::new_for_http());

    // Bind to address; a bind failure is fatal
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "order_service_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Close the broker connection; in-flight publishes are not drained
    publisher.close().await;

    info!("order_service_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("order_service_shutting_down");
}
