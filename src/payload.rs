//! Normalisation of raw device payloads into typed [`Reading`]s.
//!
//! Sensor firmware in the field is not consistent about field names
//! (`tvoc` vs `TVOC`, `eco2` vs `eCO2`) or about number encoding, so lookup
//! tries every known spelling and accepts numbers as well as numeric
//! strings. A missing or unusable field never rejects the payload; it falls
//! back to its default and is reported in [`Normalized::defaulted`].

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::models::{Reading, DEFAULT_AQI};

// ---

const TVOC_KEYS: &[&str] = &["tvoc", "TVOC"];
const TEMPERATURE_KEYS: &[&str] = &["temperature", "Temperature"];
const HUMIDITY_KEYS: &[&str] = &["humidity", "Humidity"];
const ECO2_KEYS: &[&str] = &["eco2", "eCO2"];
const AQI_KEYS: &[&str] = &["aqi", "AQI"];

/// A decoded reading together with the fields that had to be defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub reading: Reading,
    pub defaulted: Vec<&'static str>,
}

/// Decode a raw payload body for `room`.
pub fn decode(room: &str, raw: &[u8], now: DateTime<Utc>) -> Result<Normalized, DecodeError> {
    // ---
    let value: Value = serde_json::from_slice(raw)?;
    normalize(room, &value, now)
}

/// Turn an already-parsed JSON payload into a reading.
///
/// Only a non-object payload is an error.
pub fn normalize(room: &str, payload: &Value, now: DateTime<Utc>) -> Result<Normalized, DecodeError> {
    // ---
    let fields = payload
        .as_object()
        .ok_or_else(|| DecodeError::NotAnObject(json_kind(payload)))?;

    let mut defaulted = Vec::new();
    let mut float_field = |name: &'static str, keys: &[&str]| {
        lookup_f64(fields, keys).unwrap_or_else(|| {
            defaulted.push(name);
            0.0
        })
    };

    let tvoc = float_field("tvoc", TVOC_KEYS);
    let temperature = float_field("temperature", TEMPERATURE_KEYS);
    let humidity = float_field("humidity", HUMIDITY_KEYS);
    let eco2 = float_field("eco2", ECO2_KEYS);

    let aqi = match lookup_f64(fields, AQI_KEYS) {
        Some(v) if v >= i32::MIN as f64 && v <= i32::MAX as f64 => v.trunc() as i32,
        _ => {
            defaulted.push("aqi");
            DEFAULT_AQI
        }
    };

    Ok(Normalized {
        reading: Reading {
            room: room.to_string(),
            tvoc,
            temperature,
            humidity,
            eco2,
            aqi,
            timestamp: now,
        },
        defaulted,
    })
}

/// First key present with a usable numeric value wins.
fn lookup_f64(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(coerce_f64)
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
