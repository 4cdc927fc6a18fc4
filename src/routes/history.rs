use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::HistoryPoint;

// ---

const DEFAULT_HOURS: u32 = 24;
const MAX_HOURS: u32 = 24 * 30;

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/history/{room}", get(handler))
}

/// Query parameters for the history window
#[derive(Debug, Deserialize)]
struct HistoryQuery {
    hours: Option<u32>,
}

impl HistoryQuery {
    fn window(&self) -> u32 {
        self.hours.unwrap_or(DEFAULT_HOURS).clamp(1, MAX_HOURS)
    }
}

async fn handler(
    Path(room): Path<String>,
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Json<Vec<HistoryPoint>>> {
    // ---
    state.rooms.require(&room)?;
    let Query(params) = query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let hours = params.window();
    debug!(room = %room, hours, "GET /api/history");

    let points = state.storage.recent_readings(&room, hours).await?;
    Ok(Json(points))
}
