//! HTTP and WebSocket surface consumed by the dashboard.
//!
//! Each sibling module exports a subrouter; this gateway merges them and
//! attaches the shared [`AppState`].

use std::sync::Arc;

use axum::Router;

use crate::broadcast::Broadcaster;
use crate::notify::Notifier;
use crate::rooms::RoomRegistry;
use crate::storage::Storage;

mod current;
mod health;
mod history;
mod test_alert;
mod thresholds;
mod ws;

// ---

/// Handles shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
    pub storage: Arc<dyn Storage>,
    pub notifier: Arc<dyn Notifier>,
    pub broadcaster: Arc<Broadcaster>,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(current::router())
        .merge(history::router())
        .merge(thresholds::router())
        .merge(test_alert::router())
        .merge(ws::router())
        .merge(health::router())
        .with_state(state)
}
