//! Messaging transport seam
//!
//! [`MessagingTransport`] is the narrow interface the delivery and pagination
//! code talks to: send a photo or a text message to one destination, delete a
//! message. Destinations are opaque strings — either a numeric chat id or an
//! `@username` channel reference.
//!
//! [`TelegramTransport`] is the production implementation on top of teloxide,
//! with automatic retry on transient API failures. Retry lives here and only
//! here; the fan-out above never retries a destination.

use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile, MessageId, ParseMode, Recipient};
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Errors produced by transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Destination string is neither a chat id nor an `@username`
    #[error("invalid destination `{0}`")]
    InvalidDestination(String),
    /// Telegram API rejected the request or the network failed
    #[error("telegram api error: {0}")]
    Api(String),
}

/// Send/delete primitives against a single messaging destination
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// Send a photo with an HTML caption and an optional inline keyboard.
    /// Returns the identifier of the created message.
    async fn send_photo(
        &self,
        destination: &str,
        image: &Path,
        caption: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, TransportError>;

    /// Send an HTML text message. Returns the identifier of the created message.
    async fn send_text(&self, destination: &str, text: &str) -> Result<MessageId, TransportError>;

    /// Delete a previously sent message
    async fn delete_message(
        &self,
        destination: &str,
        message_id: MessageId,
    ) -> Result<(), TransportError>;
}

/// Production transport backed by the Telegram Bot API
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a teloxide bot instance
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Resolve an opaque destination string to a Telegram recipient.
///
/// `@username` strings address public channels; anything else must parse as a
/// numeric chat id.
fn recipient(destination: &str) -> Result<Recipient, TransportError> {
    if destination.starts_with('@') {
        return Ok(Recipient::ChannelUsername(destination.to_string()));
    }
    destination
        .parse::<i64>()
        .map(|id| Recipient::Id(ChatId(id)))
        .map_err(|_| TransportError::InvalidDestination(destination.to_string()))
}

/// Retry a Telegram API operation with exponential backoff and jitter
async fn retry_api_operation<F, Fut, T>(operation: F) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TransportError>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[async_trait]
impl MessagingTransport for TelegramTransport {
    async fn send_photo(
        &self,
        destination: &str,
        image: &Path,
        caption: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, TransportError> {
        let target = recipient(destination)?;

        retry_api_operation(|| async {
            let mut req = self
                .bot
                .send_photo(target.clone(), InputFile::file(image))
                .caption(caption.to_string())
                .parse_mode(ParseMode::Html);
            if let Some(kb) = keyboard.clone() {
                req = req.reply_markup(kb);
            }
            let msg = req
                .await
                .map_err(|e| TransportError::Api(e.to_string()))?;
            Ok(msg.id)
        })
        .await
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<MessageId, TransportError> {
        let target = recipient(destination)?;

        retry_api_operation(|| async {
            let msg = self
                .bot
                .send_message(target.clone(), text.to_string())
                .parse_mode(ParseMode::Html)
                .await
                .map_err(|e| TransportError::Api(e.to_string()))?;
            Ok(msg.id)
        })
        .await
    }

    async fn delete_message(
        &self,
        destination: &str,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        let target = recipient(destination)?;

        // Deletes are best-effort cleanup for callers; no retry
        self.bot
            .delete_message(target, message_id)
            .await
            .map_err(|e| TransportError::Api(e.to_string()))?;
        Ok(())
    }
}
