use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::AppState;
use crate::error::AppResult;
use crate::models::Reading;
use crate::thresholds::ThresholdSet;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/current-data/{room}", get(handler))
}

#[derive(Debug, Serialize)]
struct CurrentData {
    #[serde(flatten)]
    reading: Reading,
    thresholds: ThresholdSet,
}

/// Latest reading of a room together with its active thresholds.
async fn handler(Path(room): Path<String>, State(state): State<AppState>) -> AppResult<Json<CurrentData>> {
    // ---
    let (reading, thresholds) = state.rooms.require(&room)?.snapshot().await;
    Ok(Json(CurrentData { reading, thresholds }))
}
