use crate::config::DatabaseConfig;
use crate::errors::{Error, Result, StorageError};
use crate::model::{HourCount, StoredReading, TelemetryReading};
use crate::store::TelemetryStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::types::Json;
use sqlx::Connection;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const INSERT_READING: &str = r#"
    INSERT INTO telemetry ("DeviceID", "Status", "Timestamp", recorded_at)
    VALUES ($1, $2, $3, $4)
    "#;

// Device time when it parsed at insert, arrival time otherwise.
const READINGS: &str = r#"
    readings AS (
        SELECT id, "Status" AS status, COALESCE(recorded_at, received_at) AS at
        FROM telemetry
    )
    "#;

const SET: &str = "('1'::jsonb, 'true'::jsonb)";
const CLEAR: &str = "('0'::jsonb, 'false'::jsonb)";

const SELECT_RECENT: &str = r#"
    SELECT id, "DeviceID" AS device_id, "Status" AS status, "Timestamp" AS timestamp, received_at
    FROM telemetry
    WHERE ($1::text IS NULL OR "DeviceID" = $1)
    ORDER BY id DESC
    LIMIT $2
    "#;

#[derive(sqlx::FromRow)]
struct TelemetryRow {
    id: i64,
    device_id: String,
    status: Json<serde_json::Value>,
    timestamp: String,
    received_at: DateTime<Utc>,
}

impl From<TelemetryRow> for StoredReading {
    fn from(row: TelemetryRow) -> Self {
        Self {
            id: row.id,
            device_id: row.device_id,
            status: row.status.0,
            timestamp: row.timestamp,
            received_at: row.received_at,
        }
    }
}

/// PostgreSQL-backed store. Opens one connection per call and closes it
/// before returning; nothing is held between requests.
#[derive(Debug, Clone)]
pub struct PgStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgStore {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| Error::Config(format!("invalid DATABASE_URL: {}", e)))?;

        info!(
            "Database: {}:{}/{} (connect timeout {:?})",
            options.get_host(),
            options.get_port(),
            options.get_database().unwrap_or("<default>"),
            config.connect_timeout
        );

        Ok(Self {
            options,
            connect_timeout: config.connect_timeout,
        })
    }

    async fn connect(&self) -> std::result::Result<PgConnection, StorageError> {
        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
        {
            Ok(conn) => Ok(conn?),
            Err(_) => Err(StorageError::ConnectTimeout(self.connect_timeout)),
        }
    }
}

async fn release(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close database connection cleanly: {}", e);
    }
}

#[async_trait]
impl TelemetryStore for PgStore {
    async fn insert(&self, reading: &TelemetryReading) -> std::result::Result<(), StorageError> {
        let mut conn = self.connect().await?;

        let result = sqlx::query(INSERT_READING)
            .bind(&reading.device_id)
            .bind(Json(&reading.status))
            .bind(reading.timestamp.to_string())
            .bind(reading.timestamp.to_datetime())
            .execute(&mut conn)
            .await;

        release(conn).await;
        let done = result?;
        debug!("Inserted {} row(s) for {}", done.rows_affected(), reading.device_id);

        Ok(())
    }

    async fn recent(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> std::result::Result<Vec<StoredReading>, StorageError> {
        let mut conn = self.connect().await?;

        let result = sqlx::query_as::<_, TelemetryRow>(SELECT_RECENT)
            .bind(device_id)
            .bind(limit)
            .fetch_all(&mut conn)
            .await;

        release(conn).await;
        Ok(result?.into_iter().map(StoredReading::from).collect())
    }

    async fn last_occupied_time(
        &self,
    ) -> std::result::Result<Option<DateTime<Utc>>, StorageError> {
        let query = format!(
            "WITH {READINGS} SELECT at FROM readings WHERE status IN {SET} ORDER BY at DESC LIMIT 1"
        );
        let mut conn = self.connect().await?;

        let result = sqlx::query_scalar::<_, DateTime<Utc>>(&query)
            .fetch_optional(&mut conn)
            .await;

        release(conn).await;
        Ok(result?)
    }

    async fn clear_counts_by_hour(&self) -> std::result::Result<Vec<HourCount>, StorageError> {
        let query = format!(
            r#"WITH {READINGS}
            SELECT EXTRACT(HOUR FROM at AT TIME ZONE 'UTC')::int4 AS hour, COUNT(*) AS count
            FROM readings
            WHERE status IN {CLEAR}
            GROUP BY 1
            ORDER BY 1"#
        );
        let mut conn = self.connect().await?;

        let result = sqlx::query_as::<_, HourCount>(&query)
            .fetch_all(&mut conn)
            .await;

        release(conn).await;
        Ok(result?)
    }

    async fn average_occupancy_seconds(&self) -> std::result::Result<Option<f64>, StorageError> {
        let query = format!(
            r#"WITH {READINGS},
            spans AS (
                SELECT t1.at AS start_time, MIN(t2.at) AS end_time
                FROM readings t1
                JOIN readings t2
                    ON t1.id < t2.id
                    AND t2.at > t1.at
                    AND t1.status IN {SET}
                    AND t2.status IN {CLEAR}
                GROUP BY t1.at
            )
            SELECT AVG(EXTRACT(EPOCH FROM end_time - start_time))::float8 FROM spans"#
        );
        let mut conn = self.connect().await?;

        let result = sqlx::query_scalar::<_, Option<f64>>(&query)
            .fetch_one(&mut conn)
            .await;

        release(conn).await;
        Ok(result?)
    }

    async fn daily_occupied_minutes(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<i64, StorageError> {
        let query = format!(
            r#"WITH {READINGS},
            day AS (
                SELECT status, at, LEAD(at) OVER (ORDER BY at) AS next_at
                FROM readings
                WHERE (at AT TIME ZONE 'UTC')::date = $1
            )
            SELECT COALESCE(SUM(FLOOR(EXTRACT(EPOCH FROM next_at - at) / 60)), 0)::int8
            FROM day
            WHERE status IN {CLEAR}"#
        );
        let mut conn = self.connect().await?;

        let result = sqlx::query_scalar::<_, i64>(&query)
            .bind(date)
            .fetch_one(&mut conn)
            .await;

        release(conn).await;
        Ok(result?)
    }
}
