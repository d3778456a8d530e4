//! Replaying fan-out bus backed by per-subscriber `mpsc` channels.
//!
//! [`ProgressBus`] keeps an explicit observer list instead of a
//! `broadcast` channel: late subscribers must see the latest snapshot
//! (not the history), and closing the bus must end every subscriber's
//! stream so transports can shut their connections down.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ProgressBus
// ---------------------------------------------------------------------------

struct Inner<T> {
    next_id: u64,
    subscribers: Vec<(u64, mpsc::UnboundedSender<T>)>,
    last: Option<T>,
    closed: bool,
}

/// Observer list with replay of the most recent event.
///
/// Cloning the bus yields another handle to the same subscriber list.
pub struct ProgressBus<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ProgressBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> ProgressBus<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                subscribers: Vec::new(),
                last: None,
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // Nothing in the critical sections can leave the list half-updated.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach a subscriber.
    ///
    /// The latest event, if any, is queued on the new receiver right away.
    /// Subscribing to a closed bus yields that replay followed by the end
    /// of the stream.
    pub fn subscribe(&self) -> (Subscription<T>, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();

        if let Some(last) = &inner.last {
            let _ = tx.send(last.clone());
        }

        let id = inner.next_id;
        inner.next_id += 1;
        if !inner.closed {
            inner.subscribers.push((id, tx));
        }

        let subscription = Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        };
        (subscription, rx)
    }

    /// Store `event` as the latest snapshot and deliver it to every
    /// current subscriber, in subscription order.
    ///
    /// Subscribers whose receiver is gone are pruned. Returns the number
    /// of subscribers that received the event.
    pub fn publish(&self, event: T) -> usize {
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
        inner.last = Some(event);
        inner.subscribers.len()
    }

    /// Publish a final event, then close the bus.
    pub fn finish(&self, event: T) -> usize {
        let delivered = self.publish(event);
        self.close();
        delivered
    }

    /// Drop every subscriber's sender so their streams end.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        let count = inner.subscribers.len();
        inner.subscribers.clear();
        tracing::trace!(count, "Progress bus closed");
    }

    /// The most recently published event.
    pub fn last(&self) -> Option<T> {
        self.lock().last.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl<T: Clone + Send + 'static> Default for ProgressBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Disposer for one subscriber. Dropping it removes the subscriber from
/// the bus; it never keeps the bus alive.
pub struct Subscription<T> {
    id: u64,
    bus: Weak<Mutex<Inner<T>>>,
}

impl<T> Subscription<T> {
    /// Explicitly unsubscribe (same as dropping the handle).
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
