//! In-process fan-out of tracker notifications to SSE subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use vidora_core::models::Principal;
use vidora_processing::{NotificationSink, ProgressEvent};

/// Broadcast hub the tracker publishes into.
///
/// Publishing never blocks; a subscriber that falls more than the channel
/// capacity behind loses the oldest events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sink handed to the tracker at start time.
    pub fn sink(&self) -> Arc<dyn NotificationSink> {
        let sender = self.sender.clone();
        Arc::new(move |event: ProgressEvent| {
            // Err only means nobody is listening right now
            if sender.send(event).is_err() {
                tracing::trace!("Progress event dropped, no subscribers");
            }
        })
    }
}

/// Whether `principal` may observe events about resources owned by `event`'s owner.
pub fn is_visible_to(event: &ProgressEvent, principal: &Principal) -> bool {
    principal.can_access(event.owner_id())
}
