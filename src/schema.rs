//! Database schema management for `airwatch-monitor`.
//!
//! Ensures required tables and indexes exist before readings are accepted.
//! Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates `sensor_readings` for the per-room history, `room_thresholds` for
/// the threshold configuration and `alert_history` for dispatched alerts.
/// Safe to call on every startup; no-op if objects already exist.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // One row per ingested reading, all rooms in one table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id          BIGSERIAL PRIMARY KEY,
            room        TEXT             NOT NULL,
            tvoc        DOUBLE PRECISION NOT NULL,
            temperature DOUBLE PRECISION NOT NULL,
            humidity    DOUBLE PRECISION NOT NULL,
            eco2        DOUBLE PRECISION NOT NULL,
            aqi         INTEGER          NOT NULL,
            recorded_at TIMESTAMPTZ      NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS room_thresholds (
            room         TEXT PRIMARY KEY,
            tvoc_good    DOUBLE PRECISION NOT NULL,
            tvoc_normal  DOUBLE PRECISION NOT NULL,
            tvoc_high    DOUBLE PRECISION NOT NULL,
            temp_min     DOUBLE PRECISION NOT NULL,
            temp_max     DOUBLE PRECISION NOT NULL,
            humidity_min DOUBLE PRECISION NOT NULL,
            humidity_max DOUBLE PRECISION NOT NULL,
            eco2_min     DOUBLE PRECISION NOT NULL,
            eco2_normal  DOUBLE PRECISION NOT NULL,
            eco2_high    DOUBLE PRECISION NOT NULL,
            updated_at   TIMESTAMPTZ      NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Append-only; written only when a notification is dispatched
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alert_history (
            id              BIGSERIAL PRIMARY KEY,
            room            TEXT             NOT NULL,
            alert_type      TEXT             NOT NULL,
            message         TEXT             NOT NULL,
            value           DOUBLE PRECISION NOT NULL,
            threshold_value DOUBLE PRECISION NOT NULL,
            created_at      TIMESTAMPTZ      NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_room_time
            ON sensor_readings (room, recorded_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_alert_history_room
            ON alert_history (room);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
