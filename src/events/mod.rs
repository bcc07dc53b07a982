//! Notification bus between the client core and whatever renders it.
//!
//! Delivery is a tokio broadcast channel: thread-safe, every subscriber sees
//! every event published after it subscribed, and a subscriber that falls more
//! than [`EVENT_CAPACITY`] events behind loses the oldest ones
//! (`RecvError::Lagged`). Publishing never blocks and never fails, even with
//! no subscribers.

use tokio::sync::broadcast;

use crate::queue::Queue;

pub const EVENT_CAPACITY: usize = 256;

/// Everything the core tells the outside world.
#[derive(Debug, Clone, PartialEq)]
pub enum SrEvent {
    /// The operator must visit `verification_url` and enter `user_code`.
    VerificationRequired {
        verification_url: String,
        user_code: String,
    },
    /// Seconds left in the pending authorization window.
    AuthCountdown { remaining_secs: u64 },
    /// The device flow finished, one way or the other.
    AuthCompleted { success: bool },
    /// The API rejected the stored token; the session is now signed out.
    SessionExpired,
    QueueFetched(Queue),
    UserNameFetched(String),
    RequestsEnabled(bool),
    SongAdded { success: bool, message: String },
}

/// Cloneable publish/subscribe handle.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SrEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SrEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SrEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
