use crate::app::AppState;
use crate::errors::Error;
use crate::model::{
    AverageOccupancyResponse, DailySummaryResponse, HourCount, LastOccupiedResponse,
    LastStatusResponse, TelemetryResponse,
};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, SecondsFormat};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    device_id: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, Error> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(Error::DateParameter("date is missing".to_string())),
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::DateParameter(format!("{:?}: {}", raw, e)))
}

/// `GET /api/telemetry`
pub async fn get_telemetry(
    State(state): State<AppState>,
    Query(params): Query<TelemetryQuery>,
) -> Result<Json<TelemetryResponse>, Error> {
    let limit = clamp_limit(params.limit);

    let data = state
        .store
        .recent(params.device_id.as_deref(), limit)
        .await
        .map_err(Error::Lookup)?;

    Ok(Json(TelemetryResponse {
        total: data.len(),
        data,
        limit,
    }))
}

/// `GET /api/last-status`
pub async fn get_last_status(
    State(state): State<AppState>,
    Query(params): Query<DeviceQuery>,
) -> Result<Json<LastStatusResponse>, Error> {
    let latest = state
        .store
        .recent(params.device_id.as_deref(), 1)
        .await
        .map_err(Error::Lookup)?;

    Ok(Json(LastStatusResponse {
        occupied: latest.into_iter().next().map(|r| r.status),
    }))
}

/// `GET /api/last-occupied-time`
pub async fn get_last_occupied_time(
    State(state): State<AppState>,
) -> Result<Json<LastOccupiedResponse>, Error> {
    let at = state
        .store
        .last_occupied_time()
        .await
        .map_err(Error::Lookup)?;

    Ok(Json(LastOccupiedResponse {
        last_occupied_time: at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
    }))
}

/// `GET /api/peak-time`
pub async fn get_peak_time(State(state): State<AppState>) -> Result<Json<Vec<HourCount>>, Error> {
    let hours = state
        .store
        .clear_counts_by_hour()
        .await
        .map_err(Error::Lookup)?;

    Ok(Json(hours))
}

/// `GET /api/average-occupancy`
pub async fn get_average_occupancy(
    State(state): State<AppState>,
) -> Result<Json<AverageOccupancyResponse>, Error> {
    let average = state
        .store
        .average_occupancy_seconds()
        .await
        .map_err(Error::Lookup)?;

    // Whole seconds, truncated.
    let avg_time_seconds = match average {
        Some(secs) => Value::from(secs.trunc() as i64),
        None => Value::from("N/A"),
    };

    Ok(Json(AverageOccupancyResponse { avg_time_seconds }))
}

/// `GET /api/daily-summary?date=YYYY-MM-DD`
pub async fn get_daily_summary(
    State(state): State<AppState>,
    Query(params): Query<DateQuery>,
) -> Result<Json<DailySummaryResponse>, Error> {
    let date = parse_date(params.date.as_deref())?;

    let total_occupied_minutes = state
        .store
        .daily_occupied_minutes(date)
        .await
        .map_err(Error::Lookup)?;

    Ok(Json(DailySummaryResponse {
        total_occupied_minutes,
    }))
}
