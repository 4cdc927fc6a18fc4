//! Per-room shared state.
//!
//! Every room owns one [`RoomState`] behind its own async mutex: the latest
//! reading, the active thresholds and the cooldown map. The registry itself
//! is built once at startup and never mutated, so looking a room up takes no
//! lock and rooms never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use crate::alerts::CooldownTracker;
use crate::error::{AppError, AppResult};
use crate::models::Reading;
use crate::storage::Storage;
use crate::thresholds::ThresholdSet;

// ---

#[derive(Debug)]
pub struct RoomState {
    pub current: Reading,
    pub thresholds: ThresholdSet,
    pub cooldowns: CooldownTracker,
}

#[derive(Debug)]
pub struct Room {
    name: String,
    state: Mutex<RoomState>,
    // serializes threshold updates end to end, never taken by evaluation
    updates: Mutex<()>,
}

impl Room {
    pub fn new(name: &str, thresholds: ThresholdSet, now: DateTime<Utc>) -> Self {
        // ---
        Room {
            name: name.to_string(),
            state: Mutex::new(RoomState {
                current: Reading::empty(name, now),
                thresholds,
                cooldowns: CooldownTracker::new(),
            }),
            updates: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exclusive access for one evaluation. Do not hold across I/O.
    pub async fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().await
    }

    pub async fn snapshot(&self) -> (Reading, ThresholdSet) {
        let state = self.state.lock().await;
        (state.current.clone(), state.thresholds)
    }

    pub async fn thresholds(&self) -> ThresholdSet {
        self.state.lock().await.thresholds
    }

    /// Exclusive right to change this room's thresholds.
    ///
    /// Hold it across the in-memory swap, the database write and the
    /// broadcast so concurrent updates land in memory and storage in the
    /// same order. Readings keep flowing meanwhile: only [`Room::lock`]
    /// guards evaluation.
    pub async fn begin_update(&self) -> MutexGuard<'_, ()> {
        self.updates.lock().await
    }

    /// Swap in a validated threshold set.
    pub async fn replace_thresholds(&self, thresholds: ThresholdSet) {
        self.state.lock().await.thresholds = thresholds;
    }
}

/// The fixed set of monitored rooms.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Arc<Room>>,
}

impl RoomRegistry {
    /// Registry with default thresholds for every room.
    pub fn with_defaults<I, S>(names: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // ---
        let rooms = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                (name.to_string(), Arc::new(Room::new(name, ThresholdSet::default(), now)))
            })
            .collect();
        RoomRegistry { rooms }
    }

    /// Registry seeded with each room's stored thresholds.
    ///
    /// A room with nothing stored, or whose stored set no longer validates,
    /// or whose lookup fails, starts with the defaults.
    pub async fn load(names: &[String], storage: &dyn Storage, now: DateTime<Utc>) -> Self {
        // ---
        let mut rooms = HashMap::new();
        for name in names {
            let thresholds = match storage.load_thresholds(name).await {
                Ok(Some(stored)) if stored.validate().is_ok() => {
                    tracing::info!(room = %name, "Loaded stored thresholds");
                    stored
                }
                Ok(Some(_)) => {
                    tracing::warn!(room = %name, "Stored thresholds invalid, using defaults");
                    ThresholdSet::default()
                }
                Ok(None) => ThresholdSet::default(),
                Err(e) => {
                    tracing::error!(room = %name, error = %e, "Failed to load thresholds, using defaults");
                    ThresholdSet::default()
                }
            };
            rooms.insert(name.clone(), Arc::new(Room::new(name, thresholds, now)));
        }
        RoomRegistry { rooms }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.get(name).cloned()
    }

    /// Like [`get`](Self::get) but as a client-facing error.
    pub fn require(&self, name: &str) -> AppResult<Arc<Room>> {
        self.get(name).ok_or_else(|| AppError::UnknownRoom(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rooms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
