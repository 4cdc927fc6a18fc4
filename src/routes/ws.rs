use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info};

use super::AppState;
use crate::broadcast::{LiveEvent, SensorFrame};
use crate::error::{AppError, AppResult};
use crate::rooms::Room;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/ws/{room}", get(upgrade))
}

/// Upgrade to a live feed for one room.
///
/// The subscription is taken before the upgrade so nothing published between
/// the snapshot and the first `recv` is lost.
async fn upgrade(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    // ---
    let handle = state.rooms.require(&room)?;
    let feed = state
        .broadcaster
        .subscribe(&room)
        .ok_or_else(|| AppError::UnknownRoom(room.clone()))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, handle, feed)))
}

/// Send the room's last known reading with no alerts, then forward live
/// events until either side goes away.
async fn handle_socket(socket: WebSocket, room: Arc<Room>, mut feed: broadcast::Receiver<LiveEvent>) {
    // ---
    let conn_id = uuid::Uuid::new_v4();
    info!(room = %room.name(), conn_id = %conn_id, "Dashboard client connected");

    let (mut sink, mut stream) = socket.split();

    let (current, _) = room.snapshot().await;
    let greeting = LiveEvent::SensorData(SensorFrame::new(&current, Vec::new()));
    if send_event(&mut sink, &greeting).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = feed.recv() => match event {
                Ok(event) => {
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(conn_id = %conn_id, skipped, "Dashboard client lagging, frames skipped");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    info!(room = %room.name(), conn_id = %conn_id, "Dashboard client disconnected");
}

async fn send_event(sink: &mut SplitSink<WebSocket, Message>, event: &LiveEvent) -> Result<(), axum::Error> {
    // ---
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Failed to encode live event");
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into())).await
}
