//! Live feed to dashboard clients, one broadcast channel per room.
//!
//! Publishing never blocks: a room with no subscribers simply drops the
//! frame, and a subscriber that falls behind skips ahead (see the WebSocket
//! route).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{Alert, Reading};
use crate::thresholds::ThresholdSet;

// ---

const CHANNEL_CAPACITY: usize = 64;

/// Values pushed to dashboards after each reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorFrame {
    pub tvoc: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub eco2: f64,
    pub aqi: i32,
    pub timestamp: DateTime<Utc>,
    pub alerts: Vec<Alert>,
}

impl SensorFrame {
    pub fn new(reading: &Reading, alerts: Vec<Alert>) -> Self {
        SensorFrame {
            tvoc: reading.tvoc,
            temperature: reading.temperature,
            humidity: reading.humidity,
            eco2: reading.eco2,
            aqi: reading.aqi,
            timestamp: reading.timestamp,
            alerts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
    SensorData(SensorFrame),
    ThresholdsUpdated(ThresholdSet),
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    channels: HashMap<String, broadcast::Sender<LiveEvent>>,
}

impl Broadcaster {
    pub fn new<I, S>(rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // ---
        let channels = rooms
            .into_iter()
            .map(|room| {
                let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
                (room.as_ref().to_string(), tx)
            })
            .collect();
        Broadcaster { channels }
    }

    /// Deliver `event` to every current subscriber of `room`.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, room: &str, event: LiveEvent) -> usize {
        // ---
        let Some(tx) = self.channels.get(room) else {
            tracing::warn!(room = %room, "Publish to unknown room dropped");
            return 0;
        };
        // Err only means nobody is listening right now
        tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, room: &str) -> Option<broadcast::Receiver<LiveEvent>> {
        self.channels.get(room).map(broadcast::Sender::subscribe)
    }
}
