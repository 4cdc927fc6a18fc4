//! Reading ingestion pipeline.
//!
//! Transport tasks push [`InboundEvent`]s onto a channel; [`Pipeline::run`]
//! fans them out to one worker per room so readings for a room are handled
//! in arrival order while different rooms proceed independently.
//!
//! For each event [`Pipeline::ingest`]:
//! 1. decodes the payload (missing fields fall back to defaults)
//! 2. under the room lock, replaces the current reading and evaluates alerts
//! 3. after the lock is released, persists the reading, publishes the live
//!    frame and detaches notification dispatch

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::alerts::{dispatch, evaluate};
use crate::broadcast::{Broadcaster, LiveEvent, SensorFrame};
use crate::error::IngestError;
use crate::models::{Alert, Reading};
use crate::notify::Notifier;
use crate::payload;
use crate::rooms::RoomRegistry;
use crate::storage::Storage;

// ---

/// Events buffered per room before new ones are dropped.
///
/// A full queue sheds load: the incoming event is logged and discarded
/// before it is decoded, so it is neither persisted nor evaluated. Only a
/// room whose worker has fallen this far behind loses readings, and the
/// dispatcher never blocks on it, so the other rooms keep flowing.
const ROOM_QUEUE_DEPTH: usize = 32;

/// One payload as delivered by a transport.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub room: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

/// What one ingestion produced.
#[derive(Debug)]
pub struct IngestOutcome {
    pub reading: Reading,
    pub alerts: Vec<Alert>,
    /// Detached notification + alert-log task, when anything fired.
    pub dispatch: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct Pipeline {
    rooms: Arc<RoomRegistry>,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    broadcaster: Arc<Broadcaster>,
}

impl Pipeline {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Pipeline {
            rooms,
            storage,
            notifier,
            broadcaster,
        }
    }

    /// Process one raw payload for `room` received at `now`.
    pub async fn ingest(&self, room: &str, raw: &[u8], now: DateTime<Utc>) -> Result<IngestOutcome, IngestError> {
        // ---
        let handle = self
            .rooms
            .get(room)
            .ok_or_else(|| IngestError::UnknownRoom(room.to_string()))?;

        let normalized = payload::decode(room, raw, now)?;
        if !normalized.defaulted.is_empty() {
            tracing::warn!(room = %room, fields = ?normalized.defaulted, "Payload fields missing, using defaults");
        }
        let reading = normalized.reading;

        let evaluation = {
            let mut state = handle.lock().await;
            state.current = reading.clone();
            let thresholds = state.thresholds;
            evaluate(&reading, &thresholds, &mut state.cooldowns, now)
        };

        if let Err(e) = self.storage.insert_reading(&reading).await {
            tracing::error!(room = %room, error = %e, "Failed to store reading");
        }

        let frame = SensorFrame::new(&reading, evaluation.alerts.clone());
        self.broadcaster.publish(room, LiveEvent::SensorData(frame));

        let dispatch_task = evaluation.notification.map(|text| {
            let notifier = Arc::clone(&self.notifier);
            let storage = Arc::clone(&self.storage);
            let room = room.to_string();
            let entries = evaluation.log_entries;
            tokio::spawn(async move {
                dispatch(notifier.as_ref(), storage.as_ref(), &room, &text, &entries).await;
            })
        });

        tracing::info!(
            room = %room,
            tvoc = reading.tvoc,
            temperature = reading.temperature,
            humidity = reading.humidity,
            eco2 = reading.eco2,
            aqi = reading.aqi,
            alerts = evaluation.alerts.len(),
            "Reading ingested"
        );

        Ok(IngestOutcome {
            reading,
            alerts: evaluation.alerts,
            dispatch: dispatch_task,
        })
    }

    /// Consume `events` until every sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<InboundEvent>) {
        // ---
        let names: Vec<String> = self.rooms.names().map(str::to_string).collect();
        let mut workers = HashMap::new();
        for name in names {
            let (tx, rx) = mpsc::channel(ROOM_QUEUE_DEPTH);
            tokio::spawn(self.clone().room_worker(name.clone(), rx));
            workers.insert(name, tx);
        }

        while let Some(event) = events.recv().await {
            let Some(worker) = workers.get(&event.room) else {
                tracing::warn!(room = %event.room, "Event for unmonitored room dropped");
                continue;
            };
            match worker.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(event)) => {
                    tracing::warn!(room = %event.room, "Room queue full, reading dropped");
                }
                Err(mpsc::error::TrySendError::Closed(event)) => {
                    tracing::error!(room = %event.room, "Room worker stopped, reading dropped");
                }
            }
        }

        tracing::info!("Ingestion source closed, pipeline stopping");
    }

    async fn room_worker(self, room: String, mut events: mpsc::Receiver<InboundEvent>) {
        // ---
        tracing::debug!(room = %room, "Room worker started");
        while let Some(event) = events.recv().await {
            if let Err(e) = self.ingest(&event.room, &event.payload, event.received_at).await {
                tracing::error!(room = %room, error = %e, "Failed to ingest payload");
            }
        }
    }
}
