//! Application entry point for the `airwatch-monitor` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool and creating the schema
//! - Restoring each room's thresholds
//! - Spawning the MQTT transport and the ingestion pipeline
//! - Binding the Axum HTTP/WebSocket server and serving requests
//!
//! # Environment Variables
//! See [`airwatch::config::load_from_env`]. Logging is controlled by
//! `RUST_LOG` or `AIRWATCH_LOG_LEVEL` (default: `debug`),
//! `AIRWATCH_SPAN_EVENTS` and `FORCE_COLOR`.
use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::Router;
use chrono::Utc;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use airwatch::broadcast::Broadcaster;
use airwatch::notify::{DisabledNotifier, Notifier, TelegramNotifier};
use airwatch::rooms::RoomRegistry;
use airwatch::routes::{self, AppState};
use airwatch::storage::{PgStorage, Storage};
use airwatch::{config, mqtt, schema, Pipeline};

/// Inbound events buffered between the transport and the pipeline.
const INGEST_QUEUE_DEPTH: usize = 256;

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    let storage: Arc<dyn Storage> = Arc::new(PgStorage::new(pool));
    let notifier: Arc<dyn Notifier> = match &cfg.telegram {
        Some(t) => Arc::new(TelegramNotifier::new(&t.api_url, &t.bot_token, &t.chat_id)?),
        None => Arc::new(DisabledNotifier),
    };

    let room_names = cfg.room_names();
    let rooms = Arc::new(RoomRegistry::load(&room_names, storage.as_ref(), Utc::now()).await);
    let broadcaster = Arc::new(Broadcaster::new(&room_names));

    let pipeline = Pipeline::new(
        Arc::clone(&rooms),
        Arc::clone(&storage),
        Arc::clone(&notifier),
        Arc::clone(&broadcaster),
    );

    let (events_tx, events_rx) = mpsc::channel(INGEST_QUEUE_DEPTH);
    tokio::spawn(pipeline.run(events_rx));

    let mqtt_cfg = cfg.clone();
    tokio::spawn(async move { mqtt::run(&mqtt_cfg, events_tx).await });

    let app: Router = routes::router(AppState {
        rooms,
        storage,
        notifier,
        broadcaster,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AIRWATCH_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `AIRWATCH_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AIRWATCH_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AIRWATCH_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AIRWATCH_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,rumqttc=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
