//! One-to-many alert event fan-out.
//!
//! Wraps a bounded [`tokio::sync::broadcast`] channel. A slow or
//! disconnected subscriber lags and loses the oldest events rather
//! than stalling dispatch to the others.

use safewatch_models::AlertEvent;
use tokio::sync::broadcast;

/// Default per-subscriber queue depth.
const DEFAULT_CAPACITY: usize = 64;

/// Non-blocking broadcast fan-out for alert events.
#[derive(Debug, Clone)]
pub struct AlertBroadcaster {
    sender: broadcast::Sender<AlertEvent>,
}

impl Default for AlertBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AlertBroadcaster {
    /// Creates a broadcaster with the given per-subscriber capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Registers a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event to every live subscriber. Returns how many
    /// subscribers received it; zero subscribers is not an error.
    pub fn publish(&self, event: &AlertEvent) -> usize {
        self.sender.send(event.clone()).unwrap_or(0)
    }
}
