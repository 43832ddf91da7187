//! Telegram bot surface
//!
//! Transport implementation, caption/keyboard rendering, publishing entry
//! points, and dispatcher wiring.

/// HTML caption builders
pub mod captions;
/// Update handlers and admin commands
pub mod handlers;
/// Inline keyboard layouts
pub mod keyboard;
/// Publishing entry points and channel selection policy
pub mod publish;
/// Messaging transport seam
pub mod transport;

pub use publish::{CardPublisher, PublishError};
pub use transport::{MessagingTransport, TelegramTransport, TransportError};
