//! MQTT ingestion transport.
//!
//! Subscribes to one topic per room and forwards every publish as an
//! [`InboundEvent`]. The transport knows nothing about payload contents.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use crate::config::{Config, RoomConfig};
use crate::pipeline::InboundEvent;

// ---

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CLIENT_CAPACITY: usize = 16;

/// Maps subscribed topics back to room names.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMap {
    by_topic: HashMap<String, String>,
}

impl TopicMap {
    pub fn new(rooms: &[RoomConfig]) -> Self {
        TopicMap {
            by_topic: rooms.iter().map(|r| (r.topic.clone(), r.name.clone())).collect(),
        }
    }

    pub fn room_for(&self, topic: &str) -> Option<&str> {
        self.by_topic.get(topic).map(String::as_str)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.by_topic.keys().map(String::as_str)
    }
}

/// Connect to the broker and forward publishes to `events` until the
/// receiving side is dropped.
///
/// Connection errors are logged and polling resumes after a short delay;
/// rumqttc reconnects on the next poll and topics are resubscribed on every
/// ConnAck.
pub async fn run(config: &Config, events: mpsc::Sender<InboundEvent>) {
    // ---
    let topics = TopicMap::new(&config.rooms);

    let mut options = MqttOptions::new(&config.mqtt_client_id, &config.mqtt_broker, config.mqtt_port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(options, CLIENT_CAPACITY);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!(broker = %config.mqtt_broker, "MQTT connection established");
                subscribe_all(&client, &topics).await;
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Some(room) = topics.room_for(&publish.topic) else {
                    tracing::warn!(topic = %publish.topic, "Publish on unexpected topic ignored");
                    continue;
                };
                let event = InboundEvent {
                    room: room.to_string(),
                    payload: publish.payload.to_vec(),
                    received_at: Utc::now(),
                };
                if events.send(event).await.is_err() {
                    tracing::info!("Pipeline closed, stopping MQTT transport");
                    break;
                }
            }
            Ok(other) => {
                tracing::trace!(event = ?other, "MQTT event");
            }
            Err(e) => {
                tracing::error!(error = %e, "MQTT connection error, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

async fn subscribe_all(client: &AsyncClient, topics: &TopicMap) {
    // ---
    for topic in topics.topics() {
        match client.subscribe(topic, QoS::AtMostOnce).await {
            Ok(()) => tracing::info!(topic = %topic, "Subscribed"),
            Err(e) => tracing::error!(topic = %topic, error = %e, "Failed to subscribe"),
        }
    }
}
