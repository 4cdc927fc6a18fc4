//! Configuration loader for the `airwatch-monitor` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
use std::env;

use anyhow::{anyhow, bail, Result};

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

const DEFAULT_ROOMS: &str = "bedroom,workingroom";
const DEFAULT_TOPIC_PREFIX: &str = "sensors";
const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// A monitored room and the MQTT topic its sensor node publishes on.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomConfig {
    pub name: String,
    pub topic: String,
}

/// Bot credentials; both halves must be present to enable notifications.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Port of the HTTP/WebSocket surface.
    pub http_port: u16,

    /// Monitored rooms, in configuration order.
    pub rooms: Vec<RoomConfig>,

    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,

    /// `None` disables outbound notifications.
    pub telegram: Option<TelegramConfig>,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `MQTT_BROKER` – MQTT broker host
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `HTTP_PORT` – HTTP listen port (default: 5000)
/// - `ROOMS` – comma separated room names (default: `bedroom,workingroom`)
/// - `MQTT_PORT` – broker port (default: 1883)
/// - `MQTT_CLIENT_ID` – client id (default: `airwatch-monitor`)
/// - `MQTT_TOPIC_PREFIX` – topic is `<prefix>/<room>` (default: `sensors`)
/// - `MQTT_TOPIC_<ROOM>` – explicit topic for one room
/// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`, `TELEGRAM_API_URL`
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let mqtt_broker = require_env!("MQTT_BROKER");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);
    let http_port = parse_env!("HTTP_PORT", u16, 5000);
    let mqtt_port = parse_env!("MQTT_PORT", u16, 1883);
    let mqtt_client_id = env::var("MQTT_CLIENT_ID").unwrap_or_else(|_| "airwatch-monitor".into());

    let names = parse_rooms(&env::var("ROOMS").unwrap_or_else(|_| DEFAULT_ROOMS.into()))?;
    let prefix = env::var("MQTT_TOPIC_PREFIX").unwrap_or_else(|_| DEFAULT_TOPIC_PREFIX.into());
    let rooms = names
        .into_iter()
        .map(|name| {
            let topic = env::var(topic_override_var(&name))
                .unwrap_or_else(|_| default_topic(&prefix, &name));
            RoomConfig { name, topic }
        })
        .collect();

    let telegram = match (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID")) {
        (Ok(bot_token), Ok(chat_id)) if !bot_token.is_empty() && !chat_id.is_empty() => Some(TelegramConfig {
            api_url: env::var("TELEGRAM_API_URL").unwrap_or_else(|_| DEFAULT_TELEGRAM_API.into()),
            bot_token,
            chat_id,
        }),
        _ => None,
    };

    Ok(Config {
        db_url,
        db_pool_max,
        http_port,
        rooms,
        mqtt_broker,
        mqtt_port,
        mqtt_client_id,
        telegram,
    })
}

/// Split a comma separated room list, dropping blanks and duplicates.
pub fn parse_rooms(raw: &str) -> Result<Vec<String>> {
    // ---
    let mut rooms: Vec<String> = Vec::new();
    for name in raw.split(',').map(|s| s.trim().to_lowercase()) {
        if name.is_empty() || rooms.contains(&name) {
            continue;
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            bail!("Invalid room name '{}': use letters, digits, '_' or '-'", name);
        }
        rooms.push(name);
    }

    if rooms.is_empty() {
        bail!("ROOMS must name at least one room");
    }
    Ok(rooms)
}

fn topic_override_var(room: &str) -> String {
    format!("MQTT_TOPIC_{}", room.to_uppercase().replace('-', "_"))
}

fn default_topic(prefix: &str, room: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), room)
}

impl Config {
    pub fn room_names(&self) -> Vec<String> {
        self.rooms.iter().map(|r| r.name.clone()).collect()
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords and the bot token
    /// while showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_db_url = mask_db_url(&self.db_url);

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL   : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX    : {}", self.db_pool_max);
        tracing::info!("  HTTP_PORT      : {}", self.http_port);
        tracing::info!("  MQTT_BROKER    : {}:{}", self.mqtt_broker, self.mqtt_port);
        tracing::info!("  MQTT_CLIENT_ID : {}", self.mqtt_client_id);
        for room in &self.rooms {
            tracing::info!("  ROOM           : {} <- {}", room.name, room.topic);
        }
        match &self.telegram {
            Some(t) => tracing::info!("  TELEGRAM       : chat {} via {} (token ****)", t.chat_id, t.api_url),
            None => tracing::warn!("  TELEGRAM       : not configured, notifications disabled"),
        }
    }
}

fn mask_db_url(db_url: &str) -> String {
    // ---
    // Mask the password in the database URL for security
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // `postgres://host@...` has its only colon in the scheme
            if db_url[..colon_pos].contains("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_rooms_normalizes() {
        // ---
        let rooms = parse_rooms(" Bedroom, workingroom,,bedroom ,living-room").unwrap();
        assert_eq!(rooms, vec!["bedroom", "workingroom", "living-room"]);
    }

    #[test]
    fn test_parse_rooms_rejects_empty_and_bad_names() {
        // ---
        assert!(parse_rooms(" , ").is_err());
        assert!(parse_rooms("bed room").is_err());
        assert!(parse_rooms("a/b").is_err());
    }

    #[test]
    fn test_topic_helpers() {
        // ---
        assert_eq!(default_topic("sensors/", "bedroom"), "sensors/bedroom");
        assert_eq!(topic_override_var("living-room"), "MQTT_TOPIC_LIVING_ROOM");
    }

    #[test]
    fn test_mask_db_url() {
        // ---
        assert_eq!(
            mask_db_url("postgres://airwatch:secret@db:5432/airwatch"),
            "postgres://airwatch:****@db:5432/airwatch"
        );
        assert_eq!(mask_db_url("postgres://db/airwatch"), "postgres://db/airwatch");
    }
}
