use crate::errors::StorageError;
use crate::model::{HourCount, StoredReading, TelemetryReading};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Reads a status as the bit column the dashboard queries expect: `1`/`true`
/// is set, `0`/`false` is clear, anything else is neither.
pub fn status_bit(status: &Value) -> Option<bool> {
    match status {
        Value::Bool(bit) => Some(*bit),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(true),
            Some(v) if v == 0.0 => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Persistence collaborator for telemetry rows.
///
/// Implementations must tolerate concurrent calls; the handlers impose no
/// ordering between requests. Time-based queries use the device timestamp
/// when it parses and the arrival time otherwise.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Writes one reading as exactly one row, or nothing.
    async fn insert(&self, reading: &TelemetryReading) -> Result<(), StorageError>;

    /// Newest-first rows, optionally restricted to one device.
    async fn recent(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<StoredReading>, StorageError>;

    /// Latest time a set status was reported.
    async fn last_occupied_time(&self) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Clear-status readings per UTC hour of day, ascending by hour.
    async fn clear_counts_by_hour(&self) -> Result<Vec<HourCount>, StorageError>;

    /// Mean length in seconds from a set reading to the first later clear one.
    async fn average_occupancy_seconds(&self) -> Result<Option<f64>, StorageError>;

    /// Whole minutes on `date` (UTC) between each clear reading and the next
    /// reading of that day.
    async fn daily_occupied_minutes(&self, date: NaiveDate) -> Result<i64, StorageError>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_bit() {
        assert_eq!(status_bit(&json!(1)), Some(true));
        assert_eq!(status_bit(&json!(true)), Some(true));
        assert_eq!(status_bit(&json!(0)), Some(false));
        assert_eq!(status_bit(&json!(0.0)), Some(false));
        assert_eq!(status_bit(&json!(false)), Some(false));
        assert_eq!(status_bit(&json!(2)), None);
        assert_eq!(status_bit(&json!("1")), None);
        assert_eq!(status_bit(&json!(null)), None);
    }
}
