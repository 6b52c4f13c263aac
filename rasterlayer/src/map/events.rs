//! Map event fan-out with disposable subscriptions.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::MapEvent;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<(u64, mpsc::UnboundedSender<MapEvent>)>,
}

/// Broadcasts [`MapEvent`]s to any number of subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Subscribers>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> (Subscription, mpsc::UnboundedReceiver<MapEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.senders.push((id, tx));

        let subscription = Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        };
        (subscription, rx)
    }

    /// Deliver `event` to every live subscriber.
    ///
    /// Subscribers whose receiver was dropped are pruned.
    pub fn emit(&self, event: MapEvent) {
        self.inner
            .lock()
            .senders
            .retain(|(_, tx)| tx.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().senders.len()
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    bus: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    /// Unsubscribe now rather than at drop.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.lock().senders.retain(|(id, _)| *id != self.id);
        }
    }
}
