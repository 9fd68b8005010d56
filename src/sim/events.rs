//! Position-change event channel
//!
//! A typed publish/subscribe hub owned by the engine. Every committed move
//! lands here as a [`PositionEvent`]; consumers hold a [`Subscription`] and
//! drain at their own pace. Events from one body arrive in the order that
//! body moved; nothing is guaranteed across bodies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use glam::DVec2;

use super::body::BodyId;
use super::lock;

/// One committed move: which body, and where it now is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionEvent {
    pub body: BodyId,
    pub position: DVec2,
}

struct Subscriber {
    id: u64,
    sender: Sender<PositionEvent>,
}

/// Fan-out point for position events. One per engine.
pub(crate) struct EventHub {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl EventHub {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    pub(crate) fn subscribe(self: &Arc<Self>) -> Subscription {
        let (sender, receiver) = channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).push(Subscriber { id, sender });
        Subscription {
            hub: Arc::downgrade(self),
            id,
            receiver,
        }
    }

    /// Deliver to every live subscriber, dropping any whose receiver is gone.
    pub(crate) fn publish(&self, event: PositionEvent) {
        lock(&self.subscribers).retain(|subscriber| subscriber.sender.send(event).is_ok());
    }

    fn unsubscribe(&self, id: u64) {
        lock(&self.subscribers).retain(|subscriber| subscriber.id != id);
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

/// A cancellable handle onto the engine's position-event stream.
///
/// Dropping the subscription unsubscribes; events already queued are simply
/// discarded with the receiver.
pub struct Subscription {
    hub: Weak<EventHub>,
    id: u64,
    receiver: Receiver<PositionEvent>,
}

impl Subscription {
    /// Take the next queued event, if any, without blocking.
    pub fn try_recv(&self) -> Option<PositionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PositionEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Explicit unsubscribe; equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}
