mod common;

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::join_all;
use serde_json::json;
use tokio::sync::mpsc;

use airwatch::broadcast::LiveEvent;
use airwatch::error::IngestError;
use airwatch::{InboundEvent, Severity, Tier};
use common::{wait_for, Harness, MemoryStorage, RecordingNotifier};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 26, 18, 0, 0).unwrap()
}

fn payload(tvoc: f64, temperature: f64, humidity: f64, eco2: f64, aqi: i32) -> Vec<u8> {
    json!({
        "tvoc": tvoc,
        "temperature": temperature,
        "humidity": humidity,
        "eco2": eco2,
        "aqi": aqi
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn bedroom_tvoc_spike_fires_once_per_window() {
    // ---
    let h = Harness::new();
    let spike = payload(700.0, 22.0, 45.0, 600.0, 3);

    let first = h.pipeline.ingest("bedroom", &spike, t0()).await.unwrap();
    assert_eq!(first.alerts.len(), 1);
    assert_eq!(first.alerts[0].kind, "tvoc_too_high");
    assert_eq!(first.alerts[0].level, Tier::TooHigh);
    assert_eq!(first.alerts[0].severity, Severity::Danger);
    first.dispatch.expect("notification dispatched").await.unwrap();

    let repeat = h
        .pipeline
        .ingest("bedroom", &spike, t0() + Duration::minutes(4))
        .await
        .unwrap();
    assert!(repeat.alerts.is_empty());
    assert!(repeat.dispatch.is_none());

    let sent = h.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "bedroom");
    assert!(sent[0].1.contains("TVOC too high: 700.00 ppb"));
    assert!(sent[0].1.contains("AQI Level: Moderate"));
    assert!(sent[0].1.ends_with("increase ventilation!"));

    let log = h.storage.alert_log.lock().unwrap().clone();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].category, "tvoc_too_high");
    assert_eq!(log[0].value, 700.0);
    assert_eq!(log[0].threshold_value, 660.0);

    // both readings persisted regardless of alerting
    assert_eq!(h.storage.reading_count(), 2);
}

#[tokio::test]
async fn workingroom_cold_reading_warns() {
    // ---
    let h = Harness::new();
    let outcome = h
        .pipeline
        .ingest("workingroom", &payload(40.0, 10.0, 45.0, 600.0, 1), t0())
        .await
        .unwrap();

    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.alerts[0].kind, "temp_low");
    assert_eq!(outcome.alerts[0].severity, Severity::Warning);
    outcome.dispatch.unwrap().await.unwrap();

    let sent = h.notifier.sent.lock().unwrap().clone();
    assert!(sent[0].1.contains("Minimum Temperature (18°C)"));
}

#[tokio::test]
async fn normal_eco2_leaves_no_trace() {
    // ---
    let h = Harness::new();
    let outcome = h
        .pipeline
        .ingest("bedroom", &payload(40.0, 22.0, 45.0, 500.0, 2), t0())
        .await
        .unwrap();

    assert!(outcome.alerts.is_empty());
    assert!(outcome.dispatch.is_none());
    assert_eq!(h.notifier.count(), 0);

    let room = h.rooms.require("bedroom").unwrap();
    assert!(room.lock().await.cooldowns.is_empty());
    assert_eq!(h.storage.reading_count(), 1);
}

#[tokio::test]
async fn missing_temperature_is_defaulted_and_still_flows() {
    // ---
    let h = Harness::new();
    let mut feed = h.broadcaster.subscribe("bedroom").unwrap();
    let body = json!({"TVOC": 50, "Humidity": 40, "eCO2": 450, "AQI": 2}).to_string();

    let outcome = h.pipeline.ingest("bedroom", body.as_bytes(), t0()).await.unwrap();
    assert_eq!(outcome.reading.temperature, 0.0);

    let stored = h.storage.readings.lock().unwrap().clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].tvoc, 50.0);
    assert_eq!(stored[0].humidity, 40.0);
    assert_eq!(stored[0].eco2, 450.0);
    assert_eq!(stored[0].aqi, 2);

    match feed.recv().await.unwrap() {
        LiveEvent::SensorData(frame) => {
            assert_eq!(frame.temperature, 0.0);
            assert_eq!(frame.tvoc, 50.0);
            assert_eq!(frame.alerts, outcome.alerts);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_breaches_notify_once() {
    // ---
    let h = Harness::new();
    let spike = payload(900.0, 22.0, 45.0, 600.0, 4);

    let attempts = (0..25).map(|i| {
        let pipeline = h.pipeline.clone();
        let spike = spike.clone();
        tokio::spawn(async move {
            pipeline
                .ingest("bedroom", &spike, t0() + Duration::seconds(i))
                .await
                .unwrap()
        })
    });
    let outcomes = join_all(attempts).await;

    let fired: Vec<_> = outcomes
        .into_iter()
        .filter_map(|o| o.unwrap().dispatch)
        .collect();
    assert_eq!(fired.len(), 1);
    for task in fired {
        task.await.unwrap();
    }
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.storage.reading_count(), 25);
}

#[tokio::test]
async fn rooms_keep_independent_cooldowns() {
    // ---
    let h = Harness::new();
    let spike = payload(700.0, 22.0, 45.0, 600.0, 3);

    let bedroom = h.pipeline.ingest("bedroom", &spike, t0()).await.unwrap();
    let workingroom = h.pipeline.ingest("workingroom", &spike, t0()).await.unwrap();

    assert_eq!(bedroom.alerts.len(), 1);
    assert_eq!(workingroom.alerts.len(), 1);
}

#[tokio::test]
async fn storage_outage_does_not_stop_evaluation() {
    // ---
    let h = Harness::with(MemoryStorage::failing(), RecordingNotifier::default());
    let mut feed = h.broadcaster.subscribe("bedroom").unwrap();

    let outcome = h
        .pipeline
        .ingest("bedroom", &payload(700.0, 22.0, 45.0, 600.0, 3), t0())
        .await
        .unwrap();
    outcome.dispatch.unwrap().await.unwrap();

    assert_eq!(h.notifier.count(), 1);
    assert!(matches!(feed.recv().await, Ok(LiveEvent::SensorData(_))));

    let (current, _) = h.rooms.require("bedroom").unwrap().snapshot().await;
    assert_eq!(current.tvoc, 700.0);
}

#[tokio::test]
async fn failed_delivery_still_starts_cooldown() {
    // ---
    let h = Harness::with(MemoryStorage::default(), RecordingNotifier::failing());
    let spike = payload(700.0, 22.0, 45.0, 600.0, 3);

    let first = h.pipeline.ingest("bedroom", &spike, t0()).await.unwrap();
    first.dispatch.unwrap().await.unwrap();

    let second = h
        .pipeline
        .ingest("bedroom", &spike, t0() + Duration::minutes(1))
        .await
        .unwrap();
    assert!(second.dispatch.is_none());
    assert_eq!(h.notifier.count(), 1);

    // the alert is still logged even though delivery failed
    assert_eq!(h.storage.alert_log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn threshold_change_applies_to_next_reading() {
    // ---
    let h = Harness::new();
    let room = h.rooms.require("bedroom").unwrap();
    room.replace_thresholds(airwatch::ThresholdSet {
        temp_max: 21.0,
        ..Default::default()
    })
    .await;

    let outcome = h
        .pipeline
        .ingest("bedroom", &payload(40.0, 22.0, 45.0, 600.0, 1), t0())
        .await
        .unwrap();
    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.alerts[0].kind, "temp_high");
}

#[tokio::test]
async fn bad_input_is_rejected_without_side_effects() {
    // ---
    let h = Harness::new();

    let unknown = h.pipeline.ingest("attic", &payload(1.0, 1.0, 1.0, 1.0, 1), t0()).await;
    assert!(matches!(unknown, Err(IngestError::UnknownRoom(room)) if room == "attic"));

    let garbage = h.pipeline.ingest("bedroom", b"not json", t0()).await;
    assert!(matches!(garbage, Err(IngestError::Decode(_))));

    assert_eq!(h.storage.reading_count(), 0);
    let (current, _) = h.rooms.require("bedroom").unwrap().snapshot().await;
    assert_eq!(current.tvoc, 0.0);
}

#[tokio::test]
async fn run_routes_events_and_survives_bad_payloads() {
    // ---
    let h = Harness::new();
    let (tx, rx) = mpsc::channel(16);
    let runner = tokio::spawn(h.pipeline.clone().run(rx));

    let events = [
        ("bedroom", payload(40.0, 22.0, 45.0, 600.0, 1)),
        ("bedroom", b"{broken".to_vec()),
        ("kitchen", payload(40.0, 22.0, 45.0, 600.0, 1)),
        ("workingroom", payload(41.0, 23.0, 46.0, 610.0, 2)),
        ("bedroom", payload(42.0, 24.0, 47.0, 620.0, 1)),
    ];
    for (room, body) in events {
        tx.send(InboundEvent {
            room: room.to_string(),
            payload: body,
            received_at: Utc::now(),
        })
        .await
        .unwrap();
    }
    drop(tx);
    runner.await.unwrap();

    let storage = Arc::clone(&h.storage);
    assert!(wait_for(|| storage.reading_count() == 3).await);

    // per-room order is preserved
    let bedroom: Vec<f64> = h
        .storage
        .readings
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.room == "bedroom")
        .map(|r| r.tvoc)
        .collect();
    assert_eq!(bedroom, vec![40.0, 42.0]);

    let (current, _) = h.rooms.require("bedroom").unwrap().snapshot().await;
    assert_eq!(current.tvoc, 42.0);
}
