use crate::ingest::send_telemetry;
use crate::metrics;
use crate::rest::{
    get_average_occupancy, get_daily_summary, get_last_occupied_time, get_last_status,
    get_peak_time, get_telemetry,
};
use crate::store::TelemetryStore;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Handler state. The store is the only thing shared between requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TelemetryStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/send_telemetry", post(send_telemetry))
        .route("/api/telemetry", get(get_telemetry))
        .route("/api/last-status", get(get_last_status))
        .route("/api/last-occupied-time", get(get_last_occupied_time))
        .route("/api/peak-time", get(get_peak_time))
        .route("/api/average-occupancy", get(get_average_occupancy))
        .route("/api/daily-summary", get(get_daily_summary))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        // Failures are already logged once by `Error::into_response`.
        .layer(TraceLayer::new_for_http().on_failure(()))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
