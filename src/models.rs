//! Data models shared by the ingestion pipeline, the alert engine and the
//! HTTP surface.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

// ---

/// Default air-quality index when a payload does not carry one.
pub const DEFAULT_AQI: i32 = 1;

/// One timestamped snapshot of every monitored metric for one room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    // ---
    pub room: String,
    pub tvoc: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub eco2: f64,
    pub aqi: i32,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Placeholder reading used for a room before its first payload arrives.
    pub fn empty(room: &str, now: DateTime<Utc>) -> Self {
        // ---
        Reading {
            room: room.to_string(),
            tvoc: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            eco2: 0.0,
            aqi: DEFAULT_AQI,
            timestamp: now,
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Tvoc => self.tvoc,
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Eco2 => self.eco2,
        }
    }
}

/// Metrics that are classified and can raise alerts. AQI is advisory only
/// and deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Tvoc,
    Temperature,
    Humidity,
    Eco2,
}

impl Metric {
    /// Order in which a reading is evaluated and messages are composed.
    pub const EVALUATION_ORDER: [Metric; 4] = [
        Metric::Tvoc,
        Metric::Temperature,
        Metric::Humidity,
        Metric::Eco2,
    ];

    /// Short key used in alert types, e.g. `temp_low`.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Tvoc => "tvoc",
            Metric::Temperature => "temp",
            Metric::Humidity => "humidity",
            Metric::Eco2 => "eco2",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Tvoc => "TVOC",
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Eco2 => "CO2",
        }
    }

    /// Unit suffix, including the separating space where one is written.
    pub fn unit(self) -> &'static str {
        match self {
            Metric::Tvoc => " ppb",
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Eco2 => " ppm",
        }
    }

    /// Minimum time between two notifications for the same alert key.
    ///
    /// TVOC is the primary pollutant and re-alerts quickly; the comfort
    /// metrics and CO2 change slowly.
    pub fn cooldown(self) -> Duration {
        match self {
            Metric::Tvoc => Duration::minutes(5),
            Metric::Temperature | Metric::Humidity | Metric::Eco2 => Duration::minutes(10),
        }
    }
}

/// Severity bucket a metric value falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Good,
    Normal,
    High,
    TooHigh,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Low => "low",
            Tier::Good => "good",
            Tier::Normal => "normal",
            Tier::High => "high",
            Tier::TooHigh => "too_high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Danger,
}

/// An evaluation result pushed to dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    // ---
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub severity: Severity,
    pub level: Tier,
}

/// Flattened record of one breached metric, appended to the alert history.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertLogEntry {
    // ---
    pub room: String,
    pub category: String,
    pub message: String,
    pub value: f64,
    pub threshold_value: f64,
    pub created_at: DateTime<Utc>,
}

/// Stored reading as returned by the history query.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct HistoryPoint {
    // ---
    pub tvoc: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub eco2: f64,
    pub aqi: i32,
    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
}

/// Human-readable category for an AQI index (1 best, 5 worst).
pub fn aqi_label(aqi: i32) -> &'static str {
    match aqi {
        1 => "Excellent",
        2 => "Good",
        3 => "Moderate",
        4 => "Poor",
        5 => "Unhealthy",
        _ => "Undefined",
    }
}
