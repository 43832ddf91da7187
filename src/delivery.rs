//! Multi-channel delivery fan-out
//!
//! Sends one artifact to every configured destination in order, pacing
//! requests to stay under Telegram rate limits and recording a complete
//! per-destination outcome. One failing destination never prevents attempts
//! at the destinations after it; partial failure is data, not an error.

use crate::bot::transport::MessagingTransport;
use crate::config::{FANOUT_PACING_MS, SEND_ATTEMPT_TIMEOUT_SECS};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::{InlineKeyboardMarkup, MessageId};
use tracing::{error, info};

/// Outcome of one destination attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The message was accepted by the transport
    Sent {
        /// Identifier of the created message
        message_id: MessageId,
    },
    /// The attempt failed; the fan-out moved on to the next destination
    Failed {
        /// Human-readable failure description
        reason: String,
    },
}

impl DeliveryOutcome {
    /// Whether this attempt succeeded
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Per-destination delivery record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    /// Destination this record refers to
    pub destination: String,
    /// What happened at this destination
    pub outcome: DeliveryOutcome,
}

/// Complete report of one fan-out invocation
///
/// `results` preserves the order of the input destination list and always has
/// exactly one entry per input destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Number of destinations attempted
    pub total_destinations: usize,
    /// Number of successful sends
    pub success_count: usize,
    /// Per-destination outcomes, in input order
    pub results: Vec<DeliveryResult>,
}

impl DeliveryReport {
    /// Build a report from per-destination results, counting successes
    pub(crate) fn from_results(results: Vec<DeliveryResult>) -> Self {
        let success_count = results.iter().filter(|r| r.outcome.is_sent()).count();
        Self {
            total_destinations: results.len(),
            success_count,
            results,
        }
    }

    /// Whether at least one destination received the message.
    ///
    /// Zero successes is the only condition callers should treat as an
    /// overall failure; anything else is success with caveats.
    #[must_use]
    pub fn any_delivered(&self) -> bool {
        self.success_count > 0
    }
}

/// What a single fan-out attempt carries
enum Payload<'a> {
    Photo {
        image: &'a Path,
        caption: &'a str,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Text(&'a str),
}

/// Sequential fan-out of one artifact to a list of destinations
pub struct DeliveryFanout {
    transport: Arc<dyn MessagingTransport>,
    pacing: Duration,
    attempt_timeout: Duration,
}

impl DeliveryFanout {
    /// Create a fan-out with the default pacing and per-attempt timeout
    #[must_use]
    pub fn new(transport: Arc<dyn MessagingTransport>) -> Self {
        Self::with_pacing(
            transport,
            Duration::from_millis(FANOUT_PACING_MS),
            Duration::from_secs(SEND_ATTEMPT_TIMEOUT_SECS),
        )
    }

    /// Create a fan-out with explicit pacing and per-attempt timeout
    #[must_use]
    pub fn with_pacing(
        transport: Arc<dyn MessagingTransport>,
        pacing: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            pacing,
            attempt_timeout,
        }
    }

    /// Send a photo with caption and optional keyboard to every destination
    pub async fn broadcast_photo(
        &self,
        destinations: &[String],
        image: &Path,
        caption: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> DeliveryReport {
        self.broadcast(
            destinations,
            Payload::Photo {
                image,
                caption,
                keyboard,
            },
        )
        .await
    }

    /// Send an HTML text message to every destination
    pub async fn broadcast_text(&self, destinations: &[String], text: &str) -> DeliveryReport {
        self.broadcast(destinations, Payload::Text(text)).await
    }

    async fn broadcast(&self, destinations: &[String], payload: Payload<'_>) -> DeliveryReport {
        let mut results = Vec::with_capacity(destinations.len());

        for (i, destination) in destinations.iter().enumerate() {
            let outcome = self.attempt(destination, &payload).await;
            match &outcome {
                DeliveryOutcome::Sent { message_id } => {
                    info!(
                        "Delivered to channel {}/{}: {} (message id {})",
                        i + 1,
                        destinations.len(),
                        destination,
                        message_id.0
                    );
                }
                DeliveryOutcome::Failed { reason } => {
                    error!("Failed to deliver to {destination}: {reason}");
                }
            }
            results.push(DeliveryResult {
                destination: destination.clone(),
                outcome,
            });

            // Pace between attempts, not after the last one
            if i < destinations.len() - 1 {
                tokio::time::sleep(self.pacing).await;
            }
        }

        let report = DeliveryReport::from_results(results);
        info!(
            "Delivery summary: {}/{} channels successful",
            report.success_count, report.total_destinations
        );
        report
    }

    async fn attempt(&self, destination: &str, payload: &Payload<'_>) -> DeliveryOutcome {
        let send = async {
            match payload {
                Payload::Photo {
                    image,
                    caption,
                    keyboard,
                } => {
                    self.transport
                        .send_photo(destination, image, caption, keyboard.clone())
                        .await
                }
                Payload::Text(text) => self.transport.send_text(destination, text).await,
            }
        };

        match tokio::time::timeout(self.attempt_timeout, send).await {
            Ok(Ok(message_id)) => DeliveryOutcome::Sent { message_id },
            Ok(Err(e)) => DeliveryOutcome::Failed {
                reason: e.to_string(),
            },
            Err(_) => DeliveryOutcome::Failed {
                reason: format!("send timed out after {:?}", self.attempt_timeout),
            },
        }
    }
}
