use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Raw request body. Every field is an explicit presence type: a missing key
/// and a JSON `null` both deserialize to `None`, while `0`, `false` and `""`
/// stay `Some`.
#[derive(Debug, Default, Deserialize)]
pub struct TelemetryPayload {
    #[serde(rename = "DeviceID", default)]
    pub device_id: Option<Value>,
    #[serde(rename = "Status", default)]
    pub status: Option<Value>,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<Value>,
}

/// Device-reported time, kept in the representation the device sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Text(String),
    Number(Number),
}

impl Timestamp {
    /// Best-effort instant for time-based queries. Accepts RFC 3339, naive
    /// `YYYY-MM-DD HH:MM:SS` (read as UTC) and Unix seconds.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                        .map(|naive| naive.and_utc())
                }),
            Timestamp::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|secs| secs as i64))
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Text(text) => f.write_str(text),
            Timestamp::Number(number) => write!(f, "{}", number),
        }
    }
}

/// A validated reading, ready to be written as one row.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReading {
    pub device_id: String,
    pub status: Value,
    pub timestamp: Timestamp,
}

/// Body of a successful ingest response
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: &'static str,
    pub data: Value,
}

/// A persisted row as returned by the read endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct StoredReading {
    pub id: i64,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Status")]
    pub status: Value,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    pub received_at: DateTime<Utc>,
}

/// REST API response wrapper
#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    pub data: Vec<StoredReading>,
    pub total: usize,
    pub limit: i64,
}

/// `GET /api/last-status`
#[derive(Debug, Default, Serialize)]
pub struct LastStatusResponse {
    pub occupied: Option<Value>,
}

/// `GET /api/last-occupied-time`
#[derive(Debug, Serialize)]
pub struct LastOccupiedResponse {
    #[serde(rename = "lastOccupiedTime")]
    pub last_occupied_time: Option<String>,
}

/// One row of `GET /api/peak-time`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct HourCount {
    #[serde(rename = "Hour")]
    pub hour: i32,
    #[serde(rename = "Count")]
    pub count: i64,
}

/// `GET /api/average-occupancy`. Seconds, or `"N/A"` with no complete spans.
#[derive(Debug, Serialize)]
pub struct AverageOccupancyResponse {
    pub avg_time_seconds: Value,
}

/// `GET /api/daily-summary`
#[derive(Debug, Serialize)]
pub struct DailySummaryResponse {
    #[serde(rename = "totalOccupiedMinutes")]
    pub total_occupied_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_to_datetime() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap();

        for text in [
            "2024-01-01T08:30:00Z",
            "2024-01-01T09:30:00+01:00",
            "2024-01-01 08:30:00",
            "2024-01-01T08:30:00",
        ] {
            assert_eq!(
                Timestamp::Text(text.to_string()).to_datetime(),
                Some(expected),
                "{}",
                text
            );
        }
        assert_eq!(
            Timestamp::Number(Number::from(expected.timestamp())).to_datetime(),
            Some(expected)
        );
        assert_eq!(Timestamp::Text("t".to_string()).to_datetime(), None);
    }
}
