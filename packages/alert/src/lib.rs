#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Proximity alerting: the per-subject zone-entry state machine, the
//! distress-keyword trigger, and the dispatcher that fans a fired
//! alert out to broadcast subscribers and the subject's emergency
//! contact.
//!
//! The two alert sources (zone entry, distress keyword) run separate
//! state machine instances per subject so they never share cooldown
//! state.

pub mod broadcast;
pub mod dispatch;
pub mod distress;
pub mod proximity;

pub use broadcast::AlertBroadcaster;
pub use dispatch::{AlertDispatcher, ContactLookup, MemoryContactLookup, MockSmsNotifier, Notifier};
pub use distress::DistressMonitor;
pub use proximity::ProximityEvaluator;

use thiserror::Error;

/// Errors surfaced by contact lookup and notification providers.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The provider rejected or failed the send.
    #[error("Notification failed: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The contact directory could not be queried.
    #[error("Contact lookup failed: {message}")]
    Lookup {
        /// Description of what went wrong.
        message: String,
    },
}
