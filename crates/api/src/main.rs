use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use faultwatch_core::alert::{AlertGate, AlertPolicy, AlertStateStore};
use faultwatch_core::memory::{InMemoryAlertStateStore, InMemoryTelemetryStore};
use faultwatch_core::prediction::ThresholdPredictor;
use faultwatch_core::telemetry::TelemetryStore;
use faultwatch_db::{PgAlertStateStore, PgTelemetryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use faultwatch_api::config::{AppConfig, MonitorConfig, StoreConnection};
use faultwatch_api::engine::FaultDispatcher;
use faultwatch_api::router::build_app_router;
use faultwatch_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = AppConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        api_prefix = %config.server.api_prefix,
        store = config.monitor.store.kind(),
        "Loaded server configuration"
    );

    // --- Stores ---
    let (telemetry, alert_states) = open_stores(&config.monitor).await?;

    // --- Notifier ---
    let notifier = faultwatch_events::build_notifier(
        &config.monitor.notifier_endpoint,
        config.monitor.notifier_timeout,
    )
    .await
    .context("Failed to configure alert notifier")?;

    // --- Dispatcher ---
    let gate = AlertGate::new(alert_states, AlertPolicy::new(config.monitor.alert_cooldown));
    let predictor = Arc::new(ThresholdPredictor::new(config.monitor.thresholds));
    tracing::info!(
        thresholds = ?predictor.thresholds(),
        cooldown_secs = config.monitor.alert_cooldown.as_secs(),
        history_limit = config.monitor.history_limit,
        "Fault predictor configured"
    );
    let dispatcher = FaultDispatcher::new(telemetry, predictor, gate, notifier)
        .with_history_limit(config.monitor.history_limit)
        .with_notifier_timeout(config.monitor.notifier_timeout);

    // --- App state + router ---
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
    };
    let app = build_app_router(state, &config.server);

    // --- Start server ---
    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// `RUST_LOG` filter plus a human-readable or JSON (`LOG_FORMAT=json`) layer.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "faultwatch_api=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the telemetry and alert-state stores selected by `STORE_CONNECTION`.
async fn open_stores(
    monitor: &MonitorConfig,
) -> anyhow::Result<(Arc<dyn TelemetryStore>, Arc<dyn AlertStateStore>)> {
    match &monitor.store {
        StoreConnection::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            let telemetry: Arc<dyn TelemetryStore> = Arc::new(InMemoryTelemetryStore::new());
            let alert_states: Arc<dyn AlertStateStore> = Arc::new(InMemoryAlertStateStore::new());
            Ok((telemetry, alert_states))
        }
        StoreConnection::Postgres(url) => {
            let pool = faultwatch_db::create_pool(
                url,
                monitor.db_max_connections,
                monitor.store_timeout,
            )
            .await
            .context("Failed to connect to database")?;
            tracing::info!("Database connection pool created");

            faultwatch_db::health_check(&pool)
                .await
                .context("Database health check failed")?;

            faultwatch_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            let telemetry: Arc<dyn TelemetryStore> =
                Arc::new(PgTelemetryStore::new(pool.clone(), monitor.store_timeout));
            let alert_states: Arc<dyn AlertStateStore> =
                Arc::new(PgAlertStateStore::new(pool, monitor.store_timeout));
            Ok((telemetry, alert_states))
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
