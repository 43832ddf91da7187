//! Card publishing entry points
//!
//! [`CardPublisher`] owns the configured channel list and the
//! single-vs-multi selection policy: with more than one channel a send goes
//! through the delivery fan-out, with exactly one it goes straight to the
//! transport — same caption, same keyboard, so the two paths are
//! indistinguishable at the destination.

use crate::bot::captions;
use crate::bot::keyboard;
use crate::bot::transport::{MessagingTransport, TransportError};
use crate::card::CardRecord;
use crate::config::CONNECTION_PROBE_TEXT;
use crate::delivery::{DeliveryFanout, DeliveryOutcome, DeliveryReport, DeliveryResult};
use crate::pagination::store::{PaginationStore, StoreError};
use std::sync::Arc;
use teloxide::types::MessageId;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Errors produced by publishing operations
#[derive(Debug, Error)]
pub enum PublishError {
    /// The configured channel list is empty
    #[error("no channels configured")]
    NoChannels,
    /// Session creation was rejected
    #[error(transparent)]
    Session(#[from] StoreError),
    /// The session expired between creation and the initial post
    #[error("browsing session expired before the initial post")]
    SessionExpired,
    /// The initial post could not be sent
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result of posting a browsable multi-card message
#[derive(Debug, Clone)]
pub struct PostedSet {
    /// Session backing the post
    pub session_id: String,
    /// Identifier of the posted message
    pub message_id: MessageId,
    /// Number of cards in the session
    pub total_cards: usize,
}

/// Publishes cards and texts to the configured channels
pub struct CardPublisher {
    transport: Arc<dyn MessagingTransport>,
    fanout: DeliveryFanout,
    channels: Vec<String>,
    play_now: Url,
}

impl CardPublisher {
    /// Create a publisher with the default fan-out pacing
    #[must_use]
    pub fn new(
        transport: Arc<dyn MessagingTransport>,
        channels: Vec<String>,
        play_now: Url,
    ) -> Self {
        let fanout = DeliveryFanout::new(Arc::clone(&transport));
        Self::with_fanout(transport, fanout, channels, play_now)
    }

    /// Create a publisher around an explicitly configured fan-out
    #[must_use]
    pub fn with_fanout(
        transport: Arc<dyn MessagingTransport>,
        fanout: DeliveryFanout,
        channels: Vec<String>,
        play_now: Url,
    ) -> Self {
        Self {
            transport,
            fanout,
            channels,
            play_now,
        }
    }

    /// Configured channels, in send order
    #[must_use]
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Post one card (with the "Play now" keyboard) to every configured
    /// channel, applying the single-vs-multi selection policy.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::NoChannels`] when no channel is configured.
    /// Per-channel failures are data inside the returned report.
    pub async fn publish_card(&self, card: &CardRecord) -> Result<DeliveryReport, PublishError> {
        let caption = captions::card_caption(card);
        let controls = keyboard::play_now_keyboard(&self.play_now);

        match self.channels.as_slice() {
            [] => Err(PublishError::NoChannels),
            [only] => {
                let result = self
                    .transport
                    .send_photo(only, &card.image_path, &caption, Some(controls))
                    .await;
                Ok(single_report(only, result))
            }
            channels => Ok(self
                .fanout
                .broadcast_photo(channels, &card.image_path, &caption, Some(controls))
                .await),
        }
    }

    /// Broadcast an HTML text message to every configured channel
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::NoChannels`] when no channel is configured.
    pub async fn publish_text(&self, text: &str) -> Result<DeliveryReport, PublishError> {
        if self.channels.is_empty() {
            return Err(PublishError::NoChannels);
        }
        Ok(self.fanout.broadcast_text(&self.channels, text).await)
    }

    /// Probe every configured channel with a test message
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::NoChannels`] when no channel is configured.
    pub async fn test_connection(&self) -> Result<DeliveryReport, PublishError> {
        let report = self.publish_text(CONNECTION_PROBE_TEXT).await?;
        info!(
            "Connection test: {}/{} channels accessible",
            report.success_count, report.total_destinations
        );
        Ok(report)
    }

    /// Post a browsable multi-card message to the primary (first) channel.
    ///
    /// Creates the session, posts the first card with a paginated caption
    /// and navigation controls, then binds the sent message to the session.
    ///
    /// # Errors
    ///
    /// Fails when no channel is configured, the card set is empty, or the
    /// initial post cannot be sent.
    pub async fn publish_card_set(
        &self,
        store: &PaginationStore,
        cards: Vec<CardRecord>,
    ) -> Result<PostedSet, PublishError> {
        let Some(primary) = self.channels.first() else {
            return Err(PublishError::NoChannels);
        };

        let session_id = store.create(cards, 0).await?;
        let view = store
            .get(&session_id)
            .await
            .ok_or(PublishError::SessionExpired)?;
        let controls = keyboard::build_controls(store, &session_id, &self.play_now)
            .await
            .ok_or(PublishError::SessionExpired)?;

        let caption =
            captions::paginated_caption(&view.card, view.current_page, view.total_pages);
        let message_id = self
            .transport
            .send_photo(primary, &view.card.image_path, &caption, Some(controls))
            .await?;

        // The session may have expired mid-send; binding tolerates that
        store.bind_message(&session_id, message_id).await;

        info!(
            "Posted card set to {primary}: session {session_id}, {} cards",
            view.total_pages
        );
        Ok(PostedSet {
            session_id,
            message_id,
            total_cards: view.total_pages,
        })
    }
}

fn single_report(destination: &str, result: Result<MessageId, TransportError>) -> DeliveryReport {
    let outcome = match result {
        Ok(message_id) => DeliveryOutcome::Sent { message_id },
        Err(e) => DeliveryOutcome::Failed {
            reason: e.to_string(),
        },
    };
    DeliveryReport::from_results(vec![DeliveryResult {
        destination: destination.to_string(),
        outcome,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use teloxide::types::InlineKeyboardMarkup;

    #[derive(Default)]
    struct RecordingTransport {
        sends: Mutex<Vec<(String, String)>>,
    }

    impl RecordingTransport {
        fn sends(&self) -> Vec<(String, String)> {
            self.sends.lock().expect("stub lock poisoned").clone()
        }
    }

    #[async_trait]
    impl MessagingTransport for RecordingTransport {
        async fn send_photo(
            &self,
            destination: &str,
            _image: &Path,
            caption: &str,
            _keyboard: Option<InlineKeyboardMarkup>,
        ) -> Result<MessageId, TransportError> {
            let mut sends = self.sends.lock().expect("stub lock poisoned");
            sends.push((destination.to_string(), caption.to_string()));
            Ok(MessageId(sends.len() as i32))
        }

        async fn send_text(
            &self,
            destination: &str,
            text: &str,
        ) -> Result<MessageId, TransportError> {
            let mut sends = self.sends.lock().expect("stub lock poisoned");
            sends.push((destination.to_string(), text.to_string()));
            Ok(MessageId(sends.len() as i32))
        }

        async fn delete_message(
            &self,
            _destination: &str,
            _message_id: MessageId,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn card(name: &str) -> CardRecord {
        CardRecord {
            display_name: name.to_string(),
            rtp: 96.5,
            win_rate: 87.2,
            max_win: 10_000,
            player_count: 1543,
            provider_label: "PG Soft".to_string(),
            image_path: PathBuf::from(format!("cards/{name}.png")),
            is_new: false,
        }
    }

    fn publisher(
        transport: Arc<RecordingTransport>,
        channels: &[&str],
    ) -> CardPublisher {
        CardPublisher::new(
            transport,
            channels.iter().map(|s| (*s).to_string()).collect(),
            Url::parse("https://example.com/play").expect("static url"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_channel_uses_direct_send() {
        let transport = Arc::new(RecordingTransport::default());
        let report = publisher(transport.clone(), &["@only"])
            .publish_card(&card("a"))
            .await
            .expect("publish");

        assert_eq!(report.total_destinations, 1);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.results[0].destination, "@only");
        assert_eq!(transport.sends().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_channel_fans_out_with_same_caption() {
        let transport = Arc::new(RecordingTransport::default());
        let report = publisher(transport.clone(), &["@a", "@b"])
            .publish_card(&card("a"))
            .await
            .expect("publish");

        assert_eq!(report.total_destinations, 2);
        let sends = transport.sends();
        assert_eq!(sends.len(), 2);
        // Identical caption regardless of delivery path
        assert_eq!(sends[0].1, sends[1].1);
        assert_eq!(sends[0].1, captions::card_caption(&card("a")));
    }

    #[tokio::test]
    async fn test_empty_channel_list_is_rejected() {
        let transport = Arc::new(RecordingTransport::default());
        let publisher = publisher(transport, &[]);

        assert!(matches!(
            publisher.publish_card(&card("a")).await,
            Err(PublishError::NoChannels)
        ));
        assert!(matches!(
            publisher.publish_text("hi").await,
            Err(PublishError::NoChannels)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_card_set_posts_to_primary_and_binds_message() {
        let transport = Arc::new(RecordingTransport::default());
        let publisher = publisher(transport.clone(), &["@primary", "@other"]);
        let store = PaginationStore::new();

        let posted = publisher
            .publish_card_set(&store, vec![card("a"), card("b"), card("c")])
            .await
            .expect("post");

        assert_eq!(posted.total_cards, 3);
        let sends = transport.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, "@primary");
        assert!(sends[0].1.contains("[1/3]"));
        assert_eq!(
            store.bound_message(&posted.session_id).await,
            Some(posted.message_id)
        );
    }

    #[tokio::test]
    async fn test_card_set_rejects_empty_cards() {
        let transport = Arc::new(RecordingTransport::default());
        let publisher = publisher(transport, &["@primary"]);
        let store = PaginationStore::new();

        assert!(matches!(
            publisher.publish_card_set(&store, Vec::new()).await,
            Err(PublishError::Session(StoreError::EmptyCards))
        ));
    }
}
