#![deny(missing_docs)]
//! Cardcast — promotional game-card delivery for Telegram channels.
//!
//! Fans rendered card images out to a configured channel list with
//! per-channel outcome accounting, and hosts browsable multi-card posts
//! backed by expiring server-side pagination sessions.

/// Telegram bot surface: transport, captions, keyboards, publishing, handlers
pub mod bot;
/// Card records and card sources
pub mod card;
/// Configuration management
pub mod config;
/// Multi-channel delivery fan-out
pub mod delivery;
/// Pagination sessions and interaction routing
pub mod pagination;
/// Scheduled card sends
pub mod scheduler;
