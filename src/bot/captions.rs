//! HTML caption builders for card posts
//!
//! Captions use Telegram HTML parse mode. Free-text fields (game name,
//! provider) are escaped; everything else is generated.

use crate::card::CardRecord;

const HASHTAG_LINE: &str = "#SlotGame #Casino #OnlineGaming";

/// Caption for a standalone card post
#[must_use]
pub fn card_caption(card: &CardRecord) -> String {
    let mut caption = format!(
        "🎮 <b>{}</b>\n\n{}",
        html_escape::encode_text(&card.display_name),
        stats_block(card)
    );
    if card.is_new {
        caption.push_str("\n\n🔥 <b>New game!</b>");
    }
    caption.push_str("\n\n");
    caption.push_str(HASHTAG_LINE);
    caption
}

/// Caption for a card inside a browsable multi-card post.
///
/// The title line carries the `[current/total]` position marker and the
/// caption ends with a hint pointing at the navigation buttons.
#[must_use]
pub fn paginated_caption(card: &CardRecord, current_page: usize, total_pages: usize) -> String {
    let mut caption = format!(
        "🎮 <b>{}</b> [{current_page}/{total_pages}]\n\n{}",
        html_escape::encode_text(&card.display_name),
        stats_block(card)
    );
    if card.is_new {
        caption.push_str("\n\n🔥 <b>New game!</b>");
    }
    caption.push_str("\n\n👈👉 <b>Use the buttons below to browse more cards</b>\n\n");
    caption.push_str(HASHTAG_LINE);
    caption
}

fn stats_block(card: &CardRecord) -> String {
    format!(
        "🎯 <b>RTP:</b> {}%\n\
         💰 <b>Max win:</b> {}x\n\
         🟢 <b>Players online:</b> {}\n\
         📊 <b>Win rate:</b> {}%\n\
         🏷️ <b>Provider:</b> {}",
        card.rtp,
        group_digits(card.max_win),
        group_digits(card.player_count),
        card.win_rate,
        html_escape::encode_text(&card.provider_label),
    )
}

/// Render a number with `,` thousands separators
fn group_digits(value: u32) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
