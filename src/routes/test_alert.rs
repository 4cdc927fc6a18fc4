use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::warn;

use super::AppState;
use crate::error::AppResult;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/test-alert/{room}", get(handler))
}

#[derive(Debug, Serialize)]
struct TestAlertResponse {
    message: String,
    delivered: bool,
}

/// Push a canned message through the notification channel. The room name
/// is carried by the alert header, so the body does not repeat it.
async fn handler(Path(room): Path<String>, State(state): State<AppState>) -> AppResult<Json<TestAlertResponse>> {
    // ---
    state.rooms.require(&room)?;

    let text = "TEST ALERT - System is working normally!";
    let delivered = match state.notifier.send(&room, text).await {
        Ok(()) => true,
        Err(e) => {
            warn!(room = %room, error = %e, "Test alert not delivered");
            false
        }
    };

    Ok(Json(TestAlertResponse {
        message: format!("Test alert sent for {room}"),
        delivered,
    }))
}
