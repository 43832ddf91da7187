//! Inline keyboard layouts for card posts
//!
//! Every card post carries a "Play now" link row. Browsable posts add a
//! second row of exactly three navigation buttons; the row shape is kept
//! stable at page boundaries by swapping edge arrows for no-op buttons.

use crate::pagination::store::PaginationStore;
use crate::pagination::token::{self, NavDirection};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

/// Label of the external-link button on every card post
pub const PLAY_NOW_LABEL: &str = "Play now ▶️";
const PREV_LABEL: &str = "◀";
const NEXT_LABEL: &str = "▶";

/// Keyboard for a standalone card post: the "Play now" row only
#[must_use]
pub fn play_now_keyboard(play_now: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
        PLAY_NOW_LABEL,
        play_now.clone(),
    )]])
}

/// Keyboard for a browsable card post, built from the session's current page.
///
/// Single-card sessions get the "Play now" row only. Multi-card sessions add
/// a `◀ current/total ▶` row: arrows turn the page when a page exists in
/// that direction and degrade to no-op buttons at the edges, the center
/// label surfaces the ephemeral position notice.
///
/// Returns `None` when the session cannot be found (expired); callers must
/// not post or update a message without controls.
pub async fn build_controls(
    store: &PaginationStore,
    session_id: &str,
    play_now: &Url,
) -> Option<InlineKeyboardMarkup> {
    let view = store.get(session_id).await?;

    let mut rows = vec![vec![InlineKeyboardButton::url(
        PLAY_NOW_LABEL,
        play_now.clone(),
    )]];

    if view.total_pages > 1 {
        let prev_data = if view.has_prev {
            token::navigate_data(session_id, NavDirection::Prev)
        } else {
            token::noop_data(session_id)
        };
        let next_data = if view.has_next {
            token::navigate_data(session_id, NavDirection::Next)
        } else {
            token::noop_data(session_id)
        };

        rows.push(vec![
            InlineKeyboardButton::callback(PREV_LABEL, prev_data),
            InlineKeyboardButton::callback(
                format!("{}/{}", view.current_page, view.total_pages),
                token::info_data(session_id),
            ),
            InlineKeyboardButton::callback(NEXT_LABEL, next_data),
        ]);
    }

    Some(InlineKeyboardMarkup::new(rows))
}
