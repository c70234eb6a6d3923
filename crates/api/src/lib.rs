//! HTTP host for the order lifecycle engine.
//!
//! Exposes one route per engine operation plus health and Prometheus
//! metrics endpoints, with structured logging and per-request
//! deadlines applied at the transport boundary.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use lifecycle::{InMemoryInventoryService, InventoryPort, OrderEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, I>(
    state: Arc<AppState<S, I>>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router
where
    S: OrderStore + 'static,
    I: InventoryPort + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S, I>))
        .route("/orders", get(routes::orders::list::<S, I>))
        .route("/orders/{id}", get(routes::orders::get::<S, I>))
        .route("/orders/{id}", put(routes::orders::update::<S, I>))
        .route("/orders/{id}/details", get(routes::orders::details::<S, I>))
        .route("/orders/{id}/settle", post(routes::orders::settle::<S, I>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S, I>))
        .with_state(state)
        .merge(metrics_router)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state backed by in-memory store and inventory.
///
/// Used by tests and standalone deployments without a database. The
/// store and inventory handles are returned so callers can seed them.
pub fn create_memory_state() -> (
    Arc<AppState<InMemoryOrderStore, InMemoryInventoryService>>,
    InMemoryOrderStore,
    InMemoryInventoryService,
) {
    let store = InMemoryOrderStore::new();
    let inventory = InMemoryInventoryService::new();
    let engine = OrderEngine::new(store.clone(), inventory.clone());

    (Arc::new(AppState { engine }), store, inventory)
}
