use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use super::AppState;
use crate::broadcast::LiveEvent;
use crate::error::{AppError, AppResult};
use crate::thresholds::ThresholdSet;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/thresholds/{room}", get(fetch).post(update))
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    success: bool,
    thresholds: ThresholdSet,
}

async fn fetch(Path(room): Path<String>, State(state): State<AppState>) -> AppResult<Json<ThresholdSet>> {
    // ---
    let thresholds = state.rooms.require(&room)?.thresholds().await;
    Ok(Json(thresholds))
}

/// Replace a room's thresholds.
///
/// The body must carry every field. Validation happens before anything is
/// touched, so a rejected update leaves the active set as it was. Updates to
/// one room are applied one at a time. A failed database write is logged;
/// the new set stays active in memory.
async fn update(
    Path(room): Path<String>,
    State(state): State<AppState>,
    body: Result<Json<ThresholdSet>, JsonRejection>,
) -> AppResult<Json<UpdateResponse>> {
    // ---
    let handle = state.rooms.require(&room)?;
    let Json(thresholds) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    thresholds.validate()?;

    let _update = handle.begin_update().await;
    handle.replace_thresholds(thresholds).await;

    if let Err(e) = state.storage.save_thresholds(&room, &thresholds).await {
        error!(room = %room, error = %e, "Failed to persist thresholds");
    }
    state
        .broadcaster
        .publish(&room, LiveEvent::ThresholdsUpdated(thresholds));
    info!(room = %room, thresholds = ?thresholds, "Thresholds updated");

    Ok(Json(UpdateResponse {
        success: true,
        thresholds,
    }))
}
