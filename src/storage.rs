//! Persistence collaborator.
//!
//! The pipeline and the routes only see the [`Storage`] trait. [`PgStorage`]
//! is the Postgres implementation; the pool re-establishes dropped
//! connections on the next query, so a failed write is simply logged by the
//! caller and the following one tries again.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StorageError;
use crate::models::{AlertLogEntry, HistoryPoint, Reading};
use crate::thresholds::ThresholdSet;

// ---

#[async_trait]
pub trait Storage: Send + Sync {
    /// Append a reading to the room's history.
    async fn insert_reading(&self, reading: &Reading) -> Result<(), StorageError>;

    /// Readings of the last `hours` hours, oldest first.
    async fn recent_readings(&self, room: &str, hours: u32) -> Result<Vec<HistoryPoint>, StorageError>;

    /// Stored thresholds for `room`, if any were ever saved.
    async fn load_thresholds(&self, room: &str) -> Result<Option<ThresholdSet>, StorageError>;

    async fn save_thresholds(&self, room: &str, thresholds: &ThresholdSet) -> Result<(), StorageError>;

    async fn append_alert_log(&self, entry: &AlertLogEntry) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        PgStorage { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn insert_reading(&self, reading: &Reading) -> Result<(), StorageError> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO sensor_readings (
                room, tvoc, temperature, humidity, eco2, aqi, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&reading.room)
        .bind(reading.tvoc)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.eco2)
        .bind(reading.aqi)
        .bind(reading.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_readings(&self, room: &str, hours: u32) -> Result<Vec<HistoryPoint>, StorageError> {
        // ---
        let hours = i32::try_from(hours).unwrap_or(i32::MAX);
        let rows = sqlx::query_as::<_, HistoryPoint>(
            r#"
            SELECT tvoc, temperature, humidity, eco2, aqi, recorded_at
            FROM sensor_readings
            WHERE room = $1
              AND recorded_at >= NOW() - make_interval(hours => $2)
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(room)
        .bind(hours)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn load_thresholds(&self, room: &str) -> Result<Option<ThresholdSet>, StorageError> {
        // ---
        let row = sqlx::query_as::<_, ThresholdSet>(
            r#"
            SELECT tvoc_good, tvoc_normal, tvoc_high,
                   temp_min, temp_max,
                   humidity_min, humidity_max,
                   eco2_min, eco2_normal, eco2_high
            FROM room_thresholds
            WHERE room = $1
            "#,
        )
        .bind(room)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn save_thresholds(&self, room: &str, t: &ThresholdSet) -> Result<(), StorageError> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO room_thresholds (
                room, tvoc_good, tvoc_normal, tvoc_high,
                temp_min, temp_max, humidity_min, humidity_max,
                eco2_min, eco2_normal, eco2_high, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            ON CONFLICT (room) DO UPDATE SET
                tvoc_good    = EXCLUDED.tvoc_good,
                tvoc_normal  = EXCLUDED.tvoc_normal,
                tvoc_high    = EXCLUDED.tvoc_high,
                temp_min     = EXCLUDED.temp_min,
                temp_max     = EXCLUDED.temp_max,
                humidity_min = EXCLUDED.humidity_min,
                humidity_max = EXCLUDED.humidity_max,
                eco2_min     = EXCLUDED.eco2_min,
                eco2_normal  = EXCLUDED.eco2_normal,
                eco2_high    = EXCLUDED.eco2_high,
                updated_at   = EXCLUDED.updated_at
            "#,
        )
        .bind(room)
        .bind(t.tvoc_good)
        .bind(t.tvoc_normal)
        .bind(t.tvoc_high)
        .bind(t.temp_min)
        .bind(t.temp_max)
        .bind(t.humidity_min)
        .bind(t.humidity_max)
        .bind(t.eco2_min)
        .bind(t.eco2_normal)
        .bind(t.eco2_high)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_alert_log(&self, entry: &AlertLogEntry) -> Result<(), StorageError> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO alert_history (
                room, alert_type, message, value, threshold_value, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&entry.room)
        .bind(&entry.category)
        .bind(&entry.message)
        .bind(entry.value)
        .bind(entry.threshold_value)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
