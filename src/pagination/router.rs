//! Interaction routing for card navigation buttons
//!
//! Translates inbound callback payloads into session-store operations and
//! re-renders the hosting message after a page turn. Telegram does not allow
//! reliably swapping a photo in place, so navigation deletes the old message
//! (best-effort) and posts a fresh one with the new card, caption, and
//! keyboard.

use crate::bot::keyboard;
use crate::bot::transport::MessagingTransport;
use crate::config::NAVIGATE_REPOST_DELAY_MS;
use crate::pagination::store::{CardView, PageTurn, PaginationStore};
use crate::pagination::token::{self, NavDirection, NavToken};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::MessageId;
use tracing::{debug, info, warn};
use url::Url;

/// Result of processing one callback payload
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// A page turn was requested; `new_view` is `None` when the cursor was
    /// already at the boundary or the session is gone — nothing to re-render
    Navigate {
        /// Session the button belongs to
        session_id: String,
        /// The page to render now, if the cursor moved
        new_view: Option<CardView>,
    },
    /// The page-position label was pressed
    Info {
        /// Session the button belongs to
        session_id: String,
        /// Current page, if the session still exists
        view: Option<CardView>,
    },
    /// A placeholder button was pressed; nothing to do
    Noop {
        /// Session the button belongs to
        session_id: String,
    },
}

/// Routes decoded navigation tokens to the session store and the transport
pub struct InteractionRouter {
    store: PaginationStore,
    transport: Arc<dyn MessagingTransport>,
    play_now: Url,
    repost_delay: Duration,
}

impl InteractionRouter {
    /// Create a router with the default repost delay
    #[must_use]
    pub fn new(
        store: PaginationStore,
        transport: Arc<dyn MessagingTransport>,
        play_now: Url,
    ) -> Self {
        Self::with_repost_delay(
            store,
            transport,
            play_now,
            Duration::from_millis(NAVIGATE_REPOST_DELAY_MS),
        )
    }

    /// Create a router with an explicit delay between delete and repost
    #[must_use]
    pub fn with_repost_delay(
        store: PaginationStore,
        transport: Arc<dyn MessagingTransport>,
        play_now: Url,
        repost_delay: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            play_now,
            repost_delay,
        }
    }

    /// The session store this router operates on
    #[must_use]
    pub fn store(&self) -> &PaginationStore {
        &self.store
    }

    /// Decode a callback payload and apply it to the session store.
    ///
    /// Returns `None` for malformed payloads; stale session ids and boundary
    /// presses come back as outcomes with empty view data. Neither case has
    /// a user-visible effect.
    pub async fn process(&self, data: &str) -> Option<CallbackOutcome> {
        match token::parse(data)? {
            NavToken::Navigate {
                session_id,
                direction,
            } => {
                let turn = match direction {
                    NavDirection::Prev => self.store.retreat(&session_id).await,
                    NavDirection::Next => self.store.advance(&session_id).await,
                };
                let new_view = match turn {
                    PageTurn::Turned(view) => Some(view),
                    PageTurn::AtEdge | PageTurn::NotFound => None,
                };
                Some(CallbackOutcome::Navigate {
                    session_id,
                    new_view,
                })
            }
            NavToken::Info { session_id } => {
                let view = self.store.get(&session_id).await;
                Some(CallbackOutcome::Info { session_id, view })
            }
            NavToken::Noop { session_id } => Some(CallbackOutcome::Noop { session_id }),
        }
    }

    /// Replace the hosting message with the given page.
    ///
    /// Deletes the old message best-effort (a failed delete is logged and
    /// ignored), waits briefly, then posts the new card with a paginated
    /// caption and a fresh keyboard. Skips posting entirely if the session
    /// expired in the meantime and no keyboard can be built.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the replacement message fails.
    pub async fn render_navigation(
        &self,
        destination: &str,
        old_message: MessageId,
        view: &CardView,
    ) -> Result<()> {
        if !view.card.image_path.exists() {
            warn!(
                "Card image not found, skipping repost: {}",
                view.card.image_path.display()
            );
            return Ok(());
        }

        let Some(controls) =
            keyboard::build_controls(&self.store, &view.session_id, &self.play_now).await
        else {
            debug!("Session {} expired before repost", view.session_id);
            return Ok(());
        };

        let caption =
            crate::bot::captions::paginated_caption(&view.card, view.current_page, view.total_pages);

        if let Err(e) = self.transport.delete_message(destination, old_message).await {
            warn!("Could not delete old card message, continuing: {e}");
        }

        tokio::time::sleep(self.repost_delay).await;

        self.transport
            .send_photo(
                destination,
                &view.card.image_path,
                &caption,
                Some(controls),
            )
            .await?;

        info!(
            "Navigated to page {}/{} in session {}",
            view.current_page, view.total_pages, view.session_id
        );
        Ok(())
    }
}

/// Ephemeral notice shown when the page-position label is pressed
#[must_use]
pub fn info_notice(view: &CardView) -> String {
    format!(
        "📊 {}\nPage {} of {}",
        view.card.display_name, view.current_page, view.total_pages
    )
}
