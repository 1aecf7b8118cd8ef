//! Booking service HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # In-memory storage, local collaborators
//! cargo run --bin booking-service
//!
//! # PostgreSQL storage
//! STORAGE_BACKEND=postgres DATABASE_URL=postgres://localhost/booking \
//!     cargo run --bin booking-service
//! ```

use anyhow::Context;
use axum::{routing::get, Router};
use booking_core::environment::SystemClock;
use booking_core::ports::{AvailabilityStore, ReservationLedger};
use booking_runtime::metrics::MetricsServer;
use booking_service::clients::{HttpAccommodationDirectory, HttpNotificationGateway};
use booking_service::{
    build_router, AppState, BookingCoordinator, Config, Dependencies, Notifier, StorageBackend,
};
use booking_testing::linked_backends;
use booking_web::TokenVerifier;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booking_service=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting booking service");

    let config = Config::from_env()?;
    info!(
        backend = ?config.storage.backend,
        accommodation_service = %config.upstream.accommodation_uri,
        notification_service = %config.upstream.notification_uri,
        "Configuration loaded"
    );

    start_metrics(&config).await?;

    let (periods, ledger) = open_storage(&config).await?;

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(config.upstream.timeout_ms))
        .build()
        .context("Failed to build HTTP client")?;
    let directory = HttpAccommodationDirectory::new(
        http.clone(),
        config.upstream.accommodation_uri.clone(),
        config.breaker_config(),
    );
    let gateway = HttpNotificationGateway::new(
        http,
        &config.upstream.notification_uri,
        config.breaker_config(),
    );
    let breakers = vec![directory.breaker().clone(), gateway.breaker().clone()];

    let (notifier, worker) = Notifier::spawn(Arc::new(gateway), config.dispatcher_config());

    let coordinator = Arc::new(BookingCoordinator::new(Dependencies {
        periods,
        ledger,
        directory: Arc::new(directory),
        notifier,
        clock: Arc::new(SystemClock),
    }));
    let verifier = Arc::new(TokenVerifier::new(config.auth.jwt_secret.as_bytes()));
    let app = build_router(AppState::new(coordinator, verifier, breakers));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(address = %address, "Booking service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining notifications");
    if !worker.shutdown(config.shutdown_timeout()).await {
        warn!("Pending notifications were abandoned");
    }

    info!("Server stopped");
    Ok(())
}

async fn open_storage(
    config: &Config,
) -> anyhow::Result<(Arc<dyn AvailabilityStore>, Arc<dyn ReservationLedger>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            let (periods, ledger) = linked_backends();
            Ok((Arc::new(periods), Arc::new(ledger)))
        }
        StorageBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let pool = booking_postgres::connect(&config.storage.database_url, &config.pool_settings()).await?;
            booking_postgres::migrate(&pool).await?;
            info!("PostgreSQL ready");
            Ok((
                Arc::new(booking_postgres::PostgresAvailabilityStore::new(pool.clone())),
                Arc::new(booking_postgres::PostgresReservationLedger::new(pool)),
            ))
        }
    }
}

/// Install the Prometheus recorder and serve `/metrics` on its own listener.
async fn start_metrics(config: &Config) -> anyhow::Result<()> {
    let address = config.metrics_address();
    let mut server = MetricsServer::new(
        address
            .parse()
            .with_context(|| format!("Invalid metrics address {address}"))?,
    );
    server.start()?;

    let Some(handle) = server.handle().cloned() else {
        return Ok(());
    };
    let listener = tokio::net::TcpListener::bind(server.addr())
        .await
        .with_context(|| format!("Failed to bind metrics listener {address}"))?;
    let metrics = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics).await {
            warn!(error = %e, "Metrics listener stopped");
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
