//! Room air-quality monitor.
//!
//! Readings arrive per room over MQTT, are stored, classified against the
//! room's thresholds and, when something breaches and is not cooling down,
//! produce one combined notification. Dashboards follow each room live over
//! WebSocket and query current values, history and thresholds over HTTP.
//!
//! The modules mirror that flow: `mqtt` → `pipeline` → `alerts` → {`storage`,
//! `notify`, `broadcast`}, with `rooms` holding per-room state and `routes`
//! serving the dashboard.

pub mod alerts;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod models;
pub mod mqtt;
pub mod notify;
pub mod payload;
pub mod pipeline;
pub mod rooms;
pub mod routes;
pub mod schema;
pub mod storage;
pub mod thresholds;

pub use config::Config;
pub use models::{Alert, AlertLogEntry, HistoryPoint, Metric, Reading, Severity, Tier};
pub use pipeline::{InboundEvent, IngestOutcome, Pipeline};
pub use thresholds::ThresholdSet;
