//! Scheduled card sends
//!
//! Owns the auto-send configuration (persisted as JSON next to the binary)
//! and a single background loop that publishes one card per interval through
//! the configured channels. Only one loop may run at a time; changing the
//! cadence requires stop-then-start. A failed tick still advances the
//! schedule — failures are reported, never retried early.

use crate::bot::publish::CardPublisher;
use crate::card::CardSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How the scheduler picks the card for each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSelection {
    /// A random card from the source
    #[default]
    Random,
    /// The card named by `specific_game`
    Specific,
}

/// Persisted scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether automatic sends are enabled
    #[serde(default)]
    pub is_enabled: bool,
    /// Hours between automatic sends
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
    /// Card selection mode
    #[serde(default)]
    pub card_type: CardSelection,
    /// Game name used when `card_type` is `specific`
    #[serde(default)]
    pub specific_game: Option<String>,
}

const fn default_interval_hours() -> u32 {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            is_enabled: false,
            interval_hours: default_interval_hours(),
            card_type: CardSelection::Random,
            specific_game: None,
        }
    }
}

/// Snapshot of the scheduler for status displays
#[derive(Debug, Clone)]
pub struct ScheduleStatus {
    /// Current configuration
    pub config: SchedulerConfig,
    /// Whether the send loop is running
    pub is_running: bool,
    /// When the next automatic send is due, if a loop is running
    pub next_send_time: Option<DateTime<Utc>>,
}

/// Outcome of a configuration update
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    /// Whether a running schedule was stopped to apply the update.
    /// The caller decides whether to restart it.
    pub was_running: bool,
    /// The configuration now in effect
    pub config: SchedulerConfig,
}

struct RunningSchedule {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Interval-driven card sender
pub struct Scheduler {
    config: Mutex<SchedulerConfig>,
    config_path: PathBuf,
    running: Mutex<Option<RunningSchedule>>,
    next_send: Mutex<Option<DateTime<Utc>>>,
}

impl Scheduler {
    /// Load the scheduler, reading persisted configuration if present.
    /// A missing or unreadable config file falls back to defaults.
    #[must_use]
    pub fn load(config_path: &Path) -> Self {
        let config = match std::fs::read_to_string(config_path) {
            Ok(data) => match serde_json::from_str::<SchedulerConfig>(&data) {
                Ok(config) => {
                    info!("Scheduler config loaded: {config:?}");
                    config
                }
                Err(e) => {
                    warn!("Scheduler config unreadable, using defaults: {e}");
                    SchedulerConfig::default()
                }
            },
            Err(_) => SchedulerConfig::default(),
        };

        Self {
            config: Mutex::new(config),
            config_path: config_path.to_path_buf(),
            running: Mutex::new(None),
            next_send: Mutex::new(None),
        }
    }

    /// Start the send loop.
    ///
    /// Returns `false` without side effects when a loop is already running
    /// or the configuration has automatic sends disabled.
    pub async fn start(
        self: &Arc<Self>,
        publisher: Arc<CardPublisher>,
        source: Arc<dyn CardSource>,
    ) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            warn!("Scheduler is already running");
            return false;
        }

        let config = self.config.lock().await.clone();
        if !config.is_enabled {
            warn!("Scheduler is disabled");
            return false;
        }

        let interval_hours = config.interval_hours;
        let period = Duration::from_secs(u64::from(interval_hours) * 3600);
        *self.next_send.lock().await = Some(Utc::now() + chrono::Duration::hours(i64::from(interval_hours)));
        info!("Starting scheduler: one card every {interval_hours} hour(s)");

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let scheduler = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = loop_cancel.cancelled() => break,
                    () = tokio::time::sleep(period) => {
                        let config = scheduler.config.lock().await.clone();
                        Self::run_tick(&config, &publisher, source.as_ref()).await;
                        // Advances on failure too; failed sends are not retried early
                        *scheduler.next_send.lock().await =
                            Some(Utc::now() + chrono::Duration::hours(i64::from(interval_hours)));
                    }
                }
            }
        });

        *running = Some(RunningSchedule { cancel, task });
        true
    }

    /// Stop the send loop. Returns `false` if none was running.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(schedule) = running.take() else {
            return false;
        };
        schedule.cancel.cancel();
        schedule.task.abort();
        *self.next_send.lock().await = None;
        info!("Scheduler stopped");
        true
    }

    /// Whether the send loop is running
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Send one card immediately, outside the regular cadence.
    ///
    /// Re-anchors the next scheduled send when a loop is running. Returns
    /// whether the card reached at least one channel.
    pub async fn send_now(
        &self,
        publisher: &CardPublisher,
        source: &dyn CardSource,
    ) -> bool {
        let config = self.config.lock().await.clone();
        let delivered = Self::run_tick(&config, publisher, source).await;

        if self.is_running().await {
            *self.next_send.lock().await =
                Some(Utc::now() + chrono::Duration::hours(i64::from(config.interval_hours)));
        }
        delivered
    }

    /// Apply a new configuration, stopping a running loop first.
    ///
    /// The caller is told whether a loop was stopped and decides whether to
    /// restart it with the new cadence.
    pub async fn update_config(&self, new_config: SchedulerConfig) -> ConfigUpdate {
        let was_running = self.stop().await;

        {
            let mut config = self.config.lock().await;
            *config = new_config.clone();
        }
        self.save(&new_config);
        info!("Scheduler config updated: {new_config:?}");

        ConfigUpdate {
            was_running,
            config: new_config,
        }
    }

    /// Stop and, if enabled, start again with the current configuration
    pub async fn restart(
        self: &Arc<Self>,
        publisher: Arc<CardPublisher>,
        source: Arc<dyn CardSource>,
    ) -> bool {
        self.stop().await;
        if self.config.lock().await.is_enabled {
            return self.start(publisher, source).await;
        }
        false
    }

    /// Current configuration, running flag, and next send time
    pub async fn status(&self) -> ScheduleStatus {
        ScheduleStatus {
            config: self.config.lock().await.clone(),
            is_running: self.running.lock().await.is_some(),
            next_send_time: *self.next_send.lock().await,
        }
    }

    /// Obtain one card per the configuration and publish it.
    /// Returns whether the card reached at least one channel.
    async fn run_tick(
        config: &SchedulerConfig,
        publisher: &CardPublisher,
        source: &dyn CardSource,
    ) -> bool {
        info!("Sending scheduled card...");

        let card = match (&config.card_type, &config.specific_game) {
            (CardSelection::Specific, Some(name)) => source.card_by_name(name).await,
            _ => source.random_card().await,
        };
        let card = match card {
            Ok(card) => card,
            Err(e) => {
                error!("Failed to obtain card for scheduled send: {e}");
                return false;
            }
        };

        match publisher.publish_card(&card).await {
            Ok(report) if report.any_delivered() => {
                info!(
                    "Scheduled card `{}` sent: {}/{} channels",
                    card.display_name, report.success_count, report.total_destinations
                );
                true
            }
            Ok(_) => {
                error!(
                    "Scheduled card `{}` reached no channel",
                    card.display_name
                );
                false
            }
            Err(e) => {
                error!("Scheduled send failed: {e}");
                false
            }
        }
    }

    fn save(&self, config: &SchedulerConfig) {
        match serde_json::to_string_pretty(config) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.config_path, json) {
                    error!("Failed to save scheduler config: {e}");
                }
            }
            Err(e) => error!("Failed to serialize scheduler config: {e}"),
        }
    }
}
