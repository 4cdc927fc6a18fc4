//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use airwatch::broadcast::Broadcaster;
use airwatch::error::{NotifyError, StorageError};
use airwatch::notify::Notifier;
use airwatch::rooms::RoomRegistry;
use airwatch::routes::AppState;
use airwatch::storage::Storage;
use airwatch::{AlertLogEntry, HistoryPoint, Pipeline, Reading, ThresholdSet};

pub const ROOMS: [&str; 2] = ["bedroom", "workingroom"];

#[derive(Default)]
pub struct MemoryStorage {
    pub readings: Mutex<Vec<Reading>>,
    pub alert_log: Mutex<Vec<AlertLogEntry>>,
    pub thresholds: Mutex<HashMap<String, ThresholdSet>>,
    pub failing: bool,
    /// Delay applied to the next threshold save only.
    pub save_stall: Mutex<Option<Duration>>,
}

impl MemoryStorage {
    pub fn failing() -> Self {
        MemoryStorage {
            failing: true,
            ..Default::default()
        }
    }

    /// Storage whose first threshold save hangs for `stall`.
    pub fn slow_first_save(stall: Duration) -> Self {
        MemoryStorage {
            save_stall: Mutex::new(Some(stall)),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing {
            return Err(StorageError::Unavailable("database offline".into()));
        }
        Ok(())
    }

    pub fn reading_count(&self) -> usize {
        self.readings.lock().unwrap().len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert_reading(&self, reading: &Reading) -> Result<(), StorageError> {
        self.check()?;
        self.readings.lock().unwrap().push(reading.clone());
        Ok(())
    }

    async fn recent_readings(&self, room: &str, _hours: u32) -> Result<Vec<HistoryPoint>, StorageError> {
        self.check()?;
        let points = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.room == room)
            .map(|r| HistoryPoint {
                tvoc: r.tvoc,
                temperature: r.temperature,
                humidity: r.humidity,
                eco2: r.eco2,
                aqi: r.aqi,
                recorded_at: r.timestamp,
            })
            .collect();
        Ok(points)
    }

    async fn load_thresholds(&self, room: &str) -> Result<Option<ThresholdSet>, StorageError> {
        self.check()?;
        Ok(self.thresholds.lock().unwrap().get(room).copied())
    }

    async fn save_thresholds(&self, room: &str, thresholds: &ThresholdSet) -> Result<(), StorageError> {
        self.check()?;
        let stall = self.save_stall.lock().unwrap().take();
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        self.thresholds.lock().unwrap().insert(room.to_string(), *thresholds);
        Ok(())
    }

    async fn append_alert_log(&self, entry: &AlertLogEntry) -> Result<(), StorageError> {
        self.check()?;
        self.alert_log.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failing: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        RecordingNotifier {
            failing: true,
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, room: &str, text: &str) -> Result<(), NotifyError> {
        // attempts are recorded even when delivery "fails"
        self.sent.lock().unwrap().push((room.to_string(), text.to_string()));
        if self.failing {
            return Err(NotifyError::Status(502));
        }
        Ok(())
    }
}

pub struct Harness {
    pub rooms: Arc<RoomRegistry>,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
    pub broadcaster: Arc<Broadcaster>,
    pub pipeline: Pipeline,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(MemoryStorage::default(), RecordingNotifier::default())
    }

    pub fn with(storage: MemoryStorage, notifier: RecordingNotifier) -> Self {
        let rooms = Arc::new(RoomRegistry::with_defaults(ROOMS, Utc::now()));
        let storage = Arc::new(storage);
        let notifier = Arc::new(notifier);
        let broadcaster = Arc::new(Broadcaster::new(ROOMS));
        let pipeline = Pipeline::new(
            rooms.clone(),
            storage.clone(),
            notifier.clone(),
            broadcaster.clone(),
        );
        Harness {
            rooms,
            storage,
            notifier,
            broadcaster,
            pipeline,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            rooms: self.rooms.clone(),
            storage: self.storage.clone(),
            notifier: self.notifier.clone(),
            broadcaster: self.broadcaster.clone(),
        }
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
