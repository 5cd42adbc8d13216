//! HTTP API server with observability for the waybill tracking system.
//!
//! Provides REST endpoints for waybill lifecycle management, batch route
//! assignment, and public tracking, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use dispatch::AssignmentCoordinator;
use domain::{InMemoryNotificationSink, WaybillService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracking_store::{InMemoryProofStore, InMemoryTrackingStore, TrackingStore};

use routes::waybills::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: TrackingStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/waybills", post(routes::waybills::create::<S>))
        .route("/waybills", get(routes::waybills::list::<S>))
        .route("/waybills/{id}", get(routes::waybills::get::<S>))
        .route("/waybills/{id}/events", get(routes::waybills::events::<S>))
        .route(
            "/waybills/{id}/status",
            post(routes::waybills::transition::<S>),
        )
        .route(
            "/waybills/{id}/proof",
            post(routes::waybills::attach_proof::<S>),
        )
        .route(
            "/drivers/{id}/waybills",
            get(routes::waybills::for_driver::<S>),
        )
        .route(
            "/senders/{id}/waybills",
            get(routes::waybills::for_sender::<S>),
        )
        .route("/assignments", post(routes::assignments::create::<S>))
        .route("/track/{code}", get(routes::track::get::<S>))
        .route("/track/{code}/confirm", post(routes::track::confirm::<S>))
        .route("/track/{code}/feedback", post(routes::track::feedback::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over an in-memory store with
/// in-memory notification and proof backends.
pub fn create_default_state() -> Arc<AppState<InMemoryTrackingStore>> {
    let service = Arc::new(WaybillService::new(
        InMemoryTrackingStore::new(),
        Arc::new(InMemoryNotificationSink::new()),
        Arc::new(InMemoryProofStore::new()),
    ));
    let coordinator = AssignmentCoordinator::new(service.clone());

    Arc::new(AppState {
        service,
        coordinator,
    })
}
