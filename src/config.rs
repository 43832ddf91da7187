//! Configuration and settings management
//!
//! Loads settings from environment variables and defines delivery/session constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Channel list as a single string, separated by commas or newlines.
    /// Order determines send order; duplicates are kept as-is.
    #[serde(rename = "channel_ids")]
    pub channel_ids_str: String,

    /// Comma-separated list of Telegram user IDs allowed to run admin commands
    #[serde(rename = "admin_users")]
    pub admin_users_str: Option<String>,

    /// URL behind the "Play now" button on every posted card
    #[serde(default = "default_play_now_url")]
    pub play_now_url: String,

    /// Path to the JSON manifest of pre-rendered cards
    #[serde(default = "default_card_manifest")]
    pub card_manifest: String,

    /// Path to the persisted scheduler configuration
    #[serde(default = "default_scheduler_config")]
    pub scheduler_config: String,
}

fn default_play_now_url() -> String {
    "https://example.com/play".to_string()
}

fn default_card_manifest() -> String {
    "cards.json".to_string()
}

fn default_scheduler_config() -> String {
    "scheduler-config.json".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cardcast::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Returns the configured delivery channels in declaration order.
    ///
    /// The raw string is split on commas and newlines, entries are trimmed
    /// and empties dropped. Duplicates are intentionally not removed.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.channel_ids_str
            .split(|c: char| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Returns a set of Telegram IDs that are allowed to run admin commands
    #[must_use]
    pub fn admin_users(&self) -> HashSet<i64> {
        self.admin_users_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// Pagination session configuration
/// Time-to-live for a card browsing session, measured from creation
pub const SESSION_TTL_SECS: u64 = 30 * 60; // 30 minutes, never refreshed on access
/// Delay between deleting the old card message and posting the replacement
pub const NAVIGATE_REPOST_DELAY_MS: u64 = 500;

// Delivery configuration
/// Pacing wait between successive channel sends inside one fan-out
pub const FANOUT_PACING_MS: u64 = 1000;
/// Upper bound on a single channel send; a hung send is recorded as a failure
pub const SEND_ATTEMPT_TIMEOUT_SECS: u64 = 30;
/// Probe text used by the connection test
pub const CONNECTION_PROBE_TEXT: &str = "🤖 Bot connected and ready to send game cards!";

// Telegram API retry configuration (transport level only; the fan-out never retries)
/// Maximum retry attempts for a Telegram API call
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff delay in milliseconds
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff delay in milliseconds
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 5000;
