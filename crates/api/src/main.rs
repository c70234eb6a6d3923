//! API server entry point.

use std::sync::Arc;

use lifecycle::{
    InMemoryInventoryService, OrderEngine, PostgresInventoryStore, SweepConfig, SweepHandle,
};
use order_store::{InMemoryOrderStore, PostgresOrderStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::Config;
use api::routes::orders::AppState;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire the engine: Postgres when DATABASE_URL is set, otherwise
    //    standalone in-memory backends.
    let sweep_config = SweepConfig {
        interval: config.sweep_interval,
        pending_timeout: config.pending_timeout,
    };

    let (app, sweep): (axum::Router, SweepHandle) = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .expect("failed to connect to database");

            let store = PostgresOrderStore::new(pool.clone());
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            let inventory = PostgresInventoryStore::new(pool);

            let engine = OrderEngine::new(store, inventory);
            let sweep = engine.spawn_sweep(sweep_config);
            let state = Arc::new(AppState { engine });
            (
                api::create_app(state, metrics_handle.clone(), config.request_timeout),
                sweep,
            )
        }
        None => {
            tracing::info!("DATABASE_URL not set, running on in-memory backends");
            let engine =
                OrderEngine::new(InMemoryOrderStore::new(), InMemoryInventoryService::new());
            let sweep = engine.spawn_sweep(sweep_config);
            let state = Arc::new(AppState { engine });
            (
                api::create_app(state, metrics_handle.clone(), config.request_timeout),
                sweep,
            )
        }
    };

    // 4. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting order API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 5. Stop the sweep between passes, then exit.
    sweep.stop().await;
    tracing::info!("server shut down gracefully");
}
