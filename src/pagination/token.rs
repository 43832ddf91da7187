//! Navigation token wire codec
//!
//! Inline navigation buttons carry an opaque callback payload of exactly
//! three `_`-delimited fields: `nav_{session_id}_{action}` with
//! `action ∈ {prev, next, info, noop}`. This format is shared with already
//! deployed keyboards and must not change. Session ids never contain `_`.

/// Literal first field of every navigation token
const NAV_PREFIX: &str = "nav";

/// Direction of a page turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    /// Towards the previous card
    Prev,
    /// Towards the next card
    Next,
}

/// Decoded navigation token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavToken {
    /// Turn the page of the referenced session
    Navigate {
        /// Session the button belongs to
        session_id: String,
        /// Which way to turn
        direction: NavDirection,
    },
    /// Show the ephemeral page-position notice
    Info {
        /// Session the button belongs to
        session_id: String,
    },
    /// Placeholder button press with no effect
    Noop {
        /// Session the button belongs to
        session_id: String,
    },
}

/// Decode a callback payload into a navigation token.
///
/// Returns `None` unless the payload splits into exactly three `_`-separated
/// fields, the first field is literally `nav`, and the action is known.
/// Callers treat `None` as "ignore, no user-visible effect".
#[must_use]
pub fn parse(data: &str) -> Option<NavToken> {
    let parts: Vec<&str> = data.split('_').collect();
    if parts.len() != 3 || parts[0] != NAV_PREFIX {
        return None;
    }

    let session_id = parts[1].to_string();
    match parts[2] {
        "prev" => Some(NavToken::Navigate {
            session_id,
            direction: NavDirection::Prev,
        }),
        "next" => Some(NavToken::Navigate {
            session_id,
            direction: NavDirection::Next,
        }),
        "info" => Some(NavToken::Info { session_id }),
        "noop" => Some(NavToken::Noop { session_id }),
        _ => None,
    }
}

/// Encode a page-turn button payload
#[must_use]
pub fn navigate_data(session_id: &str, direction: NavDirection) -> String {
    let action = match direction {
        NavDirection::Prev => "prev",
        NavDirection::Next => "next",
    };
    format!("{NAV_PREFIX}_{session_id}_{action}")
}

/// Encode the page-position label payload
#[must_use]
pub fn info_data(session_id: &str) -> String {
    format!("{NAV_PREFIX}_{session_id}_info")
}

/// Encode a disabled-looking placeholder payload
#[must_use]
pub fn noop_data(session_id: &str) -> String {
    format!("{NAV_PREFIX}_{session_id}_noop")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_actions() {
        assert_eq!(
            parse("nav_abc123_next"),
            Some(NavToken::Navigate {
                session_id: "abc123".to_string(),
                direction: NavDirection::Next,
            })
        );
        assert_eq!(
            parse("nav_abc123_prev"),
            Some(NavToken::Navigate {
                session_id: "abc123".to_string(),
                direction: NavDirection::Prev,
            })
        );
        assert_eq!(
            parse("nav_abc123_info"),
            Some(NavToken::Info {
                session_id: "abc123".to_string()
            })
        );
        assert_eq!(
            parse("nav_abc123_noop"),
            Some(NavToken::Noop {
                session_id: "abc123".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rejects_wrong_prefix() {
        assert_eq!(parse("foo_abc123_next"), None);
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert_eq!(parse("nav_abc123"), None);
        assert_eq!(parse("nav_abc123_next_extra"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        assert_eq!(parse("nav_abc123_jump"), None);
    }

    #[test]
    fn test_encode_matches_wire_format() {
        assert_eq!(navigate_data("s1", NavDirection::Prev), "nav_s1_prev");
        assert_eq!(navigate_data("s1", NavDirection::Next), "nav_s1_next");
        assert_eq!(info_data("s1"), "nav_s1_info");
        assert_eq!(noop_data("s1"), "nav_s1_noop");
    }

    #[test]
    fn test_encode_parse_round_trip() {
        let data = navigate_data("deadbeef42", NavDirection::Next);
        assert_eq!(
            parse(&data),
            Some(NavToken::Navigate {
                session_id: "deadbeef42".to_string(),
                direction: NavDirection::Next,
            })
        );
    }
}
