//! Card records and card sources
//!
//! A [`CardRecord`] describes one rendered promotional card: display data plus
//! the path of the image produced by the external renderer. Records are
//! immutable once created; everything downstream only reads them.
//!
//! [`CardSource`] is the seam towards the renderer/asset pipeline. The
//! built-in [`CardLibrary`] implementation serves records from a JSON
//! manifest of pre-rendered cards.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One promotional game card, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Game title shown on the card
    pub display_name: String,
    /// Return-to-player percentage
    pub rtp: f64,
    /// Win rate percentage
    pub win_rate: f64,
    /// Maximum win multiplier
    pub max_win: u32,
    /// Current online player count
    pub player_count: u32,
    /// Game provider shown on the card
    pub provider_label: String,
    /// Path of the rendered card image
    pub image_path: PathBuf,
    /// Marks a newly released game
    #[serde(default)]
    pub is_new: bool,
}

/// Errors produced when obtaining card records
#[derive(Debug, Error)]
pub enum CardSourceError {
    /// Manifest file could not be read or parsed
    #[error("failed to load card manifest {path}: {reason}")]
    Manifest {
        /// Manifest path that failed to load
        path: PathBuf,
        /// Human-readable failure description
        reason: String,
    },
    /// The source has no cards to serve
    #[error("no cards available")]
    Empty,
    /// No card matches the requested game name
    #[error("unknown game `{0}`")]
    UnknownGame(String),
}

/// Source of rendered card records
///
/// Implemented by the manifest-backed [`CardLibrary`]; the renderer pipeline
/// that produces fresh artifacts plugs in behind the same trait.
#[async_trait]
pub trait CardSource: Send + Sync {
    /// Pick one card at random
    async fn random_card(&self) -> Result<CardRecord, CardSourceError>;

    /// Find a card by its game name (case-insensitive)
    async fn card_by_name(&self, name: &str) -> Result<CardRecord, CardSourceError>;
}

/// Card source backed by a JSON manifest of pre-rendered cards
pub struct CardLibrary {
    cards: Vec<CardRecord>,
}

impl CardLibrary {
    /// Load a library from a JSON manifest file
    ///
    /// # Errors
    ///
    /// Returns [`CardSourceError::Manifest`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CardSourceError> {
        let data = std::fs::read_to_string(path).map_err(|e| CardSourceError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let cards: Vec<CardRecord> =
            serde_json::from_str(&data).map_err(|e| CardSourceError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self { cards })
    }

    /// Build a library from already-loaded records
    #[must_use]
    pub fn from_cards(cards: Vec<CardRecord>) -> Self {
        Self { cards }
    }

    /// Number of cards in the library
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the library holds no cards
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[async_trait]
impl CardSource for CardLibrary {
    async fn random_card(&self) -> Result<CardRecord, CardSourceError> {
        self.cards
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(CardSourceError::Empty)
    }

    async fn card_by_name(&self, name: &str) -> Result<CardRecord, CardSourceError> {
        self.cards
            .iter()
            .find(|c| c.display_name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| CardSourceError::UnknownGame(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card(name: &str) -> CardRecord {
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

    #[tokio::test]
    async fn test_card_by_name_is_case_insensitive() {
        let library = CardLibrary::from_cards(vec![sample_card("Fortune Tiger")]);

        let card = library
            .card_by_name("fortune tiger")
            .await
            .expect("card should be found");
        assert_eq!(card.display_name, "Fortune Tiger");
    }

    #[tokio::test]
    async fn test_unknown_game_is_reported() {
        let library = CardLibrary::from_cards(vec![sample_card("Fortune Tiger")]);

        let err = library
            .card_by_name("Missing Game")
            .await
            .expect_err("lookup should fail");
        assert!(matches!(err, CardSourceError::UnknownGame(_)));
    }

    #[tokio::test]
    async fn test_empty_library_has_no_random_card() {
        let library = CardLibrary::from_cards(Vec::new());

        let err = library
            .random_card()
            .await
            .expect_err("empty library should fail");
        assert!(matches!(err, CardSourceError::Empty));
    }

    #[tokio::test]
    async fn test_random_card_comes_from_library() {
        let library =
            CardLibrary::from_cards(vec![sample_card("Fortune Tiger"), sample_card("Mahjong Ways")]);

        let card = library.random_card().await.expect("library is not empty");
        assert!(["Fortune Tiger", "Mahjong Ways"].contains(&card.display_name.as_str()));
    }

    #[test]
    fn test_manifest_round_trip() {
        let cards = vec![sample_card("Fortune Tiger")];
        let json = serde_json::to_string(&cards).expect("serialize");
        let parsed: Vec<CardRecord> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, cards);
    }
}
