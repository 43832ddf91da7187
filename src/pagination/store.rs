//! Card browsing session store
//!
//! Owns the lifecycle of pagination sessions: an ordered, immutable card set,
//! a cursor, and an optional bound message id, all keyed by a high-entropy
//! session id. Sessions live for a fixed TTL measured from creation; access
//! never extends the lifetime.
//!
//! Expiry is enforced by a lazy created-at check on every access, which makes
//! reachability independent of timer scheduling. A per-session timer task and
//! the [`PaginationStore::sweep_expired`] backstop only reclaim memory.
//!
//! All mutation goes through one internal lock, so concurrent page turns on
//! the same session serialize instead of losing updates.

use crate::card::CardRecord;
use crate::config::SESSION_TTL_SECS;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::MessageId;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Read-only view of a session's current page
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    /// The card at the cursor
    pub card: CardRecord,
    /// 1-based page number
    pub current_page: usize,
    /// Total number of cards in the session
    pub total_pages: usize,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_prev: bool,
    /// Owning session id
    pub session_id: String,
}

/// Result of an `advance`/`retreat` call
#[derive(Debug, Clone, PartialEq)]
pub enum PageTurn {
    /// The cursor moved; here is the new page
    Turned(CardView),
    /// The cursor was already at the boundary; state unchanged
    AtEdge,
    /// No such session (unknown id or expired)
    NotFound,
}

/// Errors produced when creating sessions
#[derive(Debug, Error)]
pub enum StoreError {
    /// A browsing session needs at least one card
    #[error("cannot create a browsing session without cards")]
    EmptyCards,
}

struct SessionEntry {
    cards: Vec<CardRecord>,
    current_index: usize,
    created_at: Instant,
    message_id: Option<MessageId>,
    expiry: Option<JoinHandle<()>>,
}

impl SessionEntry {
    fn view(&self, session_id: &str) -> CardView {
        let total_pages = self.cards.len();
        CardView {
            card: self.cards[self.current_index].clone(),
            current_page: self.current_index + 1,
            total_pages,
            has_next: self.current_index < total_pages - 1,
            has_prev: self.current_index > 0,
            session_id: session_id.to_string(),
        }
    }
}

/// Process-wide store of card browsing sessions
#[derive(Clone)]
pub struct PaginationStore {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl Default for PaginationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationStore {
    /// Create a store with the default session TTL
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(SESSION_TTL_SECS))
    }

    /// Create a store with an explicit session TTL
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Create a session over an ordered card set and schedule its expiry.
    ///
    /// The card set is fixed at creation. `initial_index` is clamped into
    /// range. Returns the fresh session id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyCards`] if `cards` is empty.
    pub async fn create(
        &self,
        cards: Vec<CardRecord>,
        initial_index: usize,
    ) -> Result<String, StoreError> {
        if cards.is_empty() {
            return Err(StoreError::EmptyCards);
        }

        let session_id = new_session_id();
        let current_index = initial_index.min(cards.len() - 1);

        // Memory reclamation only; reachability is governed by the
        // created-at check on access.
        let sessions = Arc::clone(&self.sessions);
        let expiry_id = session_id.clone();
        let ttl = self.ttl;
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            sessions.lock().await.remove(&expiry_id);
        });

        let entry = SessionEntry {
            cards,
            current_index,
            created_at: Instant::now(),
            message_id: None,
            expiry: Some(expiry),
        };
        self.sessions.lock().await.insert(session_id.clone(), entry);

        Ok(session_id)
    }

    /// Read the current page of a session
    pub async fn get(&self, session_id: &str) -> Option<CardView> {
        self.with_live_entry(session_id, |entry| entry.view(session_id))
            .await
    }

    /// Move the cursor one page forward.
    ///
    /// At the last page this is a state-preserving no-op signalled as
    /// [`PageTurn::AtEdge`].
    pub async fn advance(&self, session_id: &str) -> PageTurn {
        self.turn(session_id, TurnDirection::Forward).await
    }

    /// Move the cursor one page back; symmetric to [`Self::advance`]
    pub async fn retreat(&self, session_id: &str) -> PageTurn {
        self.turn(session_id, TurnDirection::Backward).await
    }

    /// Bind the outbound message this session is displayed in.
    ///
    /// Silently does nothing if the session is gone — the session may have
    /// expired between the send and the bind, and callers tolerate that.
    pub async fn bind_message(&self, session_id: &str, message_id: MessageId) {
        self.with_live_entry(session_id, |entry| {
            entry.message_id = Some(message_id);
        })
        .await;
    }

    /// The message id bound to a session, if any
    pub async fn bound_message(&self, session_id: &str) -> Option<MessageId> {
        self.with_live_entry(session_id, |entry| entry.message_id)
            .await
            .flatten()
    }

    /// Destroy a session ahead of its TTL
    pub async fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.remove(session_id) {
            if let Some(expiry) = entry.expiry {
                expiry.abort();
            }
        }
    }

    /// Drop every session older than the TTL; returns how many were removed.
    ///
    /// Backstop for per-session timers lost across runtime teardown; the
    /// lazy check on access keeps stale sessions unreachable either way.
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| entry.created_at.elapsed() >= self.ttl)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(entry) = sessions.remove(id) {
                if let Some(expiry) = entry.expiry {
                    expiry.abort();
                }
            }
        }
        expired.len()
    }

    /// Number of sessions currently held (including not-yet-reclaimed ones)
    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn turn(&self, session_id: &str, direction: TurnDirection) -> PageTurn {
        self.with_live_entry(session_id, |entry| {
            let last = entry.cards.len() - 1;
            let moved = match direction {
                TurnDirection::Forward if entry.current_index < last => {
                    entry.current_index += 1;
                    true
                }
                TurnDirection::Backward if entry.current_index > 0 => {
                    entry.current_index -= 1;
                    true
                }
                _ => false,
            };
            if moved {
                PageTurn::Turned(entry.view(session_id))
            } else {
                PageTurn::AtEdge
            }
        })
        .await
        .unwrap_or(PageTurn::NotFound)
    }

    /// Run `action` against a session entry, removing it first if its TTL
    /// has elapsed. Returns `None` for unknown or expired sessions.
    async fn with_live_entry<T>(
        &self,
        session_id: &str,
        action: impl FnOnce(&mut SessionEntry) -> T,
    ) -> Option<T> {
        let mut sessions = self.sessions.lock().await;

        let expired = sessions
            .get(session_id)
            .is_some_and(|entry| entry.created_at.elapsed() >= self.ttl);
        if expired {
            if let Some(entry) = sessions.remove(session_id) {
                if let Some(expiry) = entry.expiry {
                    expiry.abort();
                }
            }
            return None;
        }

        sessions.get_mut(session_id).map(action)
    }
}

enum TurnDirection {
    Forward,
    Backward,
}

/// Generate a fresh session id: a random component plus a timestamp
/// component, so collisions within a TTL window are practically impossible.
/// Contains no `_`, keeping it safe inside navigation tokens.
fn new_session_id() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!("{}{millis:x}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

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

    fn cards(n: usize) -> Vec<CardRecord> {
        (0..n).map(|i| card(&format!("game-{i}"))).collect()
    }

    #[tokio::test]
    async fn test_create_rejects_empty_card_set() {
        let store = PaginationStore::new();
        let err = store
            .create(Vec::new(), 0)
            .await
            .expect_err("empty set must be rejected");
        assert!(matches!(err, StoreError::EmptyCards));
    }

    #[tokio::test]
    async fn test_fresh_session_view() {
        let store = PaginationStore::new();
        let id = store.create(cards(5), 0).await.expect("create");

        let view = store.get(&id).await.expect("session exists");
        assert_eq!(view.current_page, 1);
        assert_eq!(view.total_pages, 5);
        assert!(!view.has_prev);
        assert!(view.has_next);
        assert_eq!(view.session_id, id);
        assert_eq!(view.card.display_name, "game-0");
    }

    #[tokio::test]
    async fn test_advance_to_last_page_then_boundary() {
        let store = PaginationStore::new();
        let id = store.create(cards(5), 0).await.expect("create");

        for _ in 0..4 {
            assert!(matches!(store.advance(&id).await, PageTurn::Turned(_)));
        }
        let view = store.get(&id).await.expect("session exists");
        assert_eq!(view.current_page, 5);
        assert!(!view.has_next);

        // A fifth advance is a silent no-op
        assert_eq!(store.advance(&id).await, PageTurn::AtEdge);
        let view = store.get(&id).await.expect("session exists");
        assert_eq!(view.current_page, 5);
    }

    #[tokio::test]
    async fn test_retreat_at_first_page_is_boundary() {
        let store = PaginationStore::new();
        let id = store.create(cards(3), 0).await.expect("create");

        assert_eq!(store.retreat(&id).await, PageTurn::AtEdge);
        let view = store.get(&id).await.expect("session exists");
        assert_eq!(view.current_page, 1);
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let store = PaginationStore::new();
        let id = store.create(cards(3), 0).await.expect("create");
        store.advance(&id).await;

        for _ in 0..10 {
            let view = store.get(&id).await.expect("session exists");
            assert_eq!(view.current_page, 2);
        }
    }

    #[tokio::test]
    async fn test_initial_index_is_clamped() {
        let store = PaginationStore::new();
        let id = store.create(cards(3), 99).await.expect("create");

        let view = store.get(&id).await.expect("session exists");
        assert_eq!(view.current_page, 3);
    }

    #[tokio::test]
    async fn test_unknown_session_operations() {
        let store = PaginationStore::new();

        assert!(store.get("nope").await.is_none());
        assert_eq!(store.advance("nope").await, PageTurn::NotFound);
        assert_eq!(store.retreat("nope").await, PageTurn::NotFound);
        // bind_message on an absent session is tolerated
        store.bind_message("nope", MessageId(7)).await;
    }

    #[tokio::test]
    async fn test_bind_and_read_message_id() {
        let store = PaginationStore::new();
        let id = store.create(cards(2), 0).await.expect("create");

        assert_eq!(store.bound_message(&id).await, None);
        store.bind_message(&id, MessageId(42)).await;
        assert_eq!(store.bound_message(&id).await, Some(MessageId(42)));
    }

    #[tokio::test]
    async fn test_remove_terminates_session() {
        let store = PaginationStore::new();
        let id = store.create(cards(2), 0).await.expect("create");

        store.remove(&id).await;
        assert!(store.get(&id).await.is_none());
        assert_eq!(store.advance(&id).await, PageTurn::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expires_after_ttl() {
        let store = PaginationStore::new();
        let id = store.create(cards(2), 0).await.expect("create");

        tokio::time::advance(Duration::from_secs(SESSION_TTL_SECS)).await;
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_does_not_extend_ttl() {
        let store = PaginationStore::new();
        let id = store.create(cards(2), 0).await.expect("create");

        tokio::time::advance(Duration::from_secs(SESSION_TTL_SECS - 60)).await;
        assert!(store.get(&id).await.is_some());

        // One more minute passes; the earlier read must not have reset expiry
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_timer_reclaims_without_access() {
        let store = PaginationStore::new();
        store.create(cards(2), 0).await.expect("create");

        // Let the expiry task register its timer before advancing the clock
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(SESSION_TTL_SECS + 1)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(store.active_sessions().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired_counts_removed_sessions() {
        let store = PaginationStore::with_ttl(Duration::from_secs(60));
        let old_a = store.create(cards(2), 0).await.expect("create");
        let old_b = store.create(cards(2), 0).await.expect("create");

        tokio::time::advance(Duration::from_secs(45)).await;
        let fresh = store.create(cards(2), 0).await.expect("create");

        tokio::time::advance(Duration::from_secs(30)).await;
        // The per-session timers for old_a/old_b may already have reclaimed
        // them; the sweep must remove whatever is left over the TTL.
        let removed = store.sweep_expired().await;
        assert!(removed <= 2);
        assert!(store.get(&old_a).await.is_none());
        assert!(store.get(&old_b).await.is_none());
        assert!(store.get(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_advances_do_not_lose_updates() {
        let store = PaginationStore::new();
        let id = store.create(cards(3), 0).await.expect("create");

        let (a, b) = tokio::join!(store.advance(&id), store.advance(&id));
        assert!(matches!(a, PageTurn::Turned(_)));
        assert!(matches!(b, PageTurn::Turned(_)));

        let view = store.get(&id).await.expect("session exists");
        assert_eq!(view.current_page, 3);
    }

    #[tokio::test]
    async fn test_session_ids_are_unique_and_underscore_free() {
        let store = PaginationStore::new();
        let a = store.create(cards(1), 0).await.expect("create");
        let b = store.create(cards(1), 0).await.expect("create");

        assert_ne!(a, b);
        assert!(!a.contains('_'));
        assert!(!b.contains('_'));
    }
}
