// src/routes/health.rs
//! Liveness endpoint.
//!
//! Used by container orchestrators and the dashboard to verify that the
//! service is up. It reports how many rooms are monitored but deliberately
//! does not touch the database or the broker.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    rooms: usize,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rooms: state.rooms.len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
