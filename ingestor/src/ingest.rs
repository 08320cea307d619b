use crate::app::AppState;
use crate::errors::{Error, Result};
use crate::metrics::{
    INSERT_LATENCY_SECONDS, INVALID_TOTAL, MALFORMED_TOTAL, REQUESTS_TOTAL,
    STORAGE_FAILURES_TOTAL, STORED_TOTAL,
};
use crate::model::IngestResponse;
use crate::store::TelemetryStore;
use crate::validate::{parse_body, validate};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Instant;
use tracing::info;

pub const SUCCESS_MESSAGE: &str = "Data received and stored successfully.";

/// `POST /api/send_telemetry`
///
/// A body that cannot be read, including one over the request body limit,
/// takes the malformed-request path.
pub async fn send_telemetry(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    REQUESTS_TOTAL.inc();

    let outcome = match body {
        Ok(body) => ingest(state.store.as_ref(), &body).await,
        Err(rejection) => Err(Error::UnreadableBody(rejection.body_text())),
    };

    match outcome {
        Ok(data) => (
            StatusCode::OK,
            Json(IngestResponse {
                message: SUCCESS_MESSAGE,
                data,
            }),
        )
            .into_response(),
        Err(e) => {
            count_failure(&e);
            e.into_response()
        }
    }
}

/// Parses, validates and stores one reading. Returns the parsed body for the
/// response echo. The store is only touched once validation has passed.
pub async fn ingest(store: &dyn TelemetryStore, body: &[u8]) -> Result<serde_json::Value> {
    let payload = parse_body(body)?;
    let reading = validate(&payload)?;

    let start = Instant::now();
    store.insert(&reading).await.map_err(Error::Storage)?;
    INSERT_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

    info!(
        device_id = %reading.device_id,
        status = %reading.status,
        timestamp = %reading.timestamp,
        "Data successfully stored in the database"
    );
    STORED_TOTAL.inc();

    Ok(payload)
}

fn count_failure(e: &Error) {
    match e {
        Error::MalformedRequest(_) | Error::UnreadableBody(_) => MALFORMED_TOTAL.inc(),
        Error::Validation(_) => INVALID_TOTAL.inc(),
        _ => STORAGE_FAILURES_TOTAL.inc(),
    }
}
