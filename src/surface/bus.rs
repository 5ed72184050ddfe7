//! Event Bus
//!
//! Broadcast channel carrying [`RaceEvent`]s from a race to any number of
//! subscribers. Publishing never blocks; a subscriber that falls more than
//! the channel capacity behind loses the oldest events.

use tokio::sync::broadcast;
use tracing::trace;

use crate::game::events::RaceEvent;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Publish side of the race notification channel.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<RaceEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus holding up to `capacity` undelivered events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RaceEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Returns how many subscribers will see it.
    pub fn publish(&self, event: RaceEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!(kind = event.kind(), "no subscribers, event dropped");
                0
            }
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
