//! Outbound notification channel.
//!
//! Delivery is best effort: callers log the outcome and move on, nothing is
//! retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::NotifyError;

// ---

/// Ceiling for a single delivery attempt.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` on behalf of `room`.
    async fn send(&self, room: &str, text: &str) -> Result<(), NotifyError>;
}

/// Telegram Bot API `sendMessage` delivery.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, bot_token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        // ---
        let client = reqwest::Client::builder().timeout(NOTIFY_TIMEOUT).build()?;

        Ok(TelegramNotifier {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), bot_token),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, room: &str, text: &str) -> Result<(), NotifyError> {
        // ---
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: format_alert(room, text),
        };

        // the endpoint embeds the bot token; keep it out of error text
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        tracing::info!(room = %room, "Notification delivered");
        Ok(())
    }
}

/// Stand-in used when no bot credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, room: &str, text: &str) -> Result<(), NotifyError> {
        tracing::warn!(room = %room, text = %text, "Notification channel disabled, dropping message");
        Err(NotifyError::Disabled)
    }
}

/// Header line plus body, as shown in the chat.
pub fn format_alert(room: &str, text: &str) -> String {
    format!("ALERT from {}\n\n{}", capitalize(room), text)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
