//! In-process event bus on a tokio broadcast channel.
//!
//! Works within a single process only.

use tokio::sync::broadcast;

use feed_core::ports::{EventSink, PostEvent};

/// Broadcasts every committed change to all live subscribers.
pub struct BroadcastEventBus {
    sender: broadcast::Sender<PostEvent>,
}

impl BroadcastEventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size.max(1));
        Self { sender }
    }

    /// New receiver that sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PostEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastEventBus {
    fn publish(&self, event: PostEvent) {
        let name = event.name();
        // Ignore send errors (no subscribers)
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(event = name, receivers, "Event published"),
            Err(_) => tracing::trace!(event = name, "No subscribers for event"),
        }
    }
}
