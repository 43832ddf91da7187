//! Stateful card browsing over a stateless messaging transport
//!
//! A multi-card post is backed by a server-side session: the ordered card
//! set, a cursor, and a TTL. Inline buttons carry compact tokens that route
//! back into the session store.

/// Interaction routing for navigation buttons
pub mod router;
/// Session store and lifecycle
pub mod store;
/// Navigation token wire codec
pub mod token;

pub use router::{CallbackOutcome, InteractionRouter};
pub use store::{CardView, PageTurn, PaginationStore, StoreError};
pub use token::{NavDirection, NavToken};
