use chrono::{DateTime, Utc};

use super::classifier::classify;
use super::cooldown::{AlertKey, CooldownTracker};
use crate::models::{aqi_label, Alert, AlertLogEntry, Metric, Reading};
use crate::notify::Notifier;
use crate::storage::Storage;
use crate::thresholds::ThresholdSet;

// ---

pub const RECOMMENDATION: &str = "Recommendation: Open windows or increase ventilation!";

const SEPARATOR: &str = "\n";

/// Outcome of evaluating one reading.
///
/// `alerts` goes to dashboard clients; `notification` and `log_entries` are
/// handed to [`dispatch`] once the room lock has been released.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub alerts: Vec<Alert>,
    pub notification: Option<String>,
    pub log_entries: Vec<AlertLogEntry>,
}

/// Classify every metric of `reading` and decide what fires.
///
/// A metric in a quiet tier is skipped without touching the cooldown map.
/// A breach still inside its cooldown window is dropped entirely, it does not
/// reach the dashboard either. Everything that fires is combined into a
/// single notification, annotated with the room's AQI category.
pub fn evaluate(
    reading: &Reading,
    thresholds: &ThresholdSet,
    cooldowns: &mut CooldownTracker,
    now: DateTime<Utc>,
) -> Evaluation {
    // ---
    let mut evaluation = Evaluation::default();
    let mut messages = Vec::new();

    for metric in Metric::EVALUATION_ORDER {
        let value = reading.value(metric);
        let classification = classify(metric, value, thresholds);
        let Some(breach) = classification.breach else {
            continue;
        };

        let key = AlertKey::new(&reading.room, metric, classification.tier);
        if !cooldowns.should_fire(&key, now, metric.cooldown()) {
            tracing::debug!(room = %reading.room, alert = %key.kind(), "Alert suppressed by cooldown");
            continue;
        }

        let kind = key.kind();
        evaluation.alerts.push(Alert {
            kind: kind.clone(),
            message: format!("{}: {:.2}{}", metric.label(), value, metric.unit()),
            severity: classification.severity,
            level: classification.tier,
        });
        evaluation.log_entries.push(AlertLogEntry {
            room: reading.room.clone(),
            category: kind,
            message: breach.message.clone(),
            value,
            threshold_value: breach.bound,
            created_at: now,
        });
        messages.push(breach.message);
    }

    if !messages.is_empty() {
        messages.push(format!("AQI Level: {}", aqi_label(reading.aqi)));
        let body = messages.join(SEPARATOR);
        evaluation.notification = Some(format!("{body}{SEPARATOR}{RECOMMENDATION}"));
    }

    evaluation
}

/// Send the combined notification and append one log entry per breach.
///
/// Failures are logged and swallowed; the cooldown entries recorded by
/// [`evaluate`] stand regardless of the outcome.
pub async fn dispatch(
    notifier: &dyn Notifier,
    storage: &dyn Storage,
    room: &str,
    notification: &str,
    log_entries: &[AlertLogEntry],
) {
    // ---
    match notifier.send(room, notification).await {
        Ok(()) => tracing::info!(room = %room, alerts = log_entries.len(), "Alert notification sent"),
        Err(e) => tracing::error!(room = %room, error = %e, "Failed to send alert notification"),
    }

    for entry in log_entries {
        if let Err(e) = storage.append_alert_log(entry).await {
            tracing::error!(room = %room, alert = %entry.category, error = %e, "Failed to log alert");
        }
    }
}
