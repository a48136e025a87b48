//! Replay-latest broadcast channel
//!
//! A `StateChannel` holds the most recently published value and fans every
//! publish out to its observers. Each observer is an independent cursor: it
//! starts with the value current at subscription time and then receives every
//! later publish exactly once, in publish order. Nothing older than the latest
//! value is retained for new observers.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

struct Shared<T> {
    latest: Option<T>,
    observers: Vec<mpsc::UnboundedSender<T>>,
    publish_count: u64,
}

/// Broadcast holder of the latest value of `T`.
///
/// Cloning yields another handle to the same channel.
pub struct StateChannel<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for StateChannel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> StateChannel<T> {
    /// Creates a channel with no value yet; observers wait for the first publish.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                latest: None,
                observers: Vec::new(),
                publish_count: 0,
            })),
        }
    }

    /// Creates a channel seeded with an initial value.
    ///
    /// The seed is replayed to observers but does not count as a publish.
    pub fn with_value(value: T) -> Self {
        let channel = Self::new();
        channel.shared.lock().latest = Some(value);
        channel
    }

    /// Stores `value` as the latest and notifies every observer in subscription order.
    pub fn publish(&self, value: T) {
        let mut shared = self.shared.lock();
        Self::deliver(&mut shared, value);
    }

    /// Publishes the value produced by `update` from the current one, if any.
    ///
    /// The read and the publish happen under one lock, so concurrent writers
    /// cannot interleave between the check and the store. Returns whether a
    /// value was published.
    pub fn publish_with<F>(&self, update: F) -> bool
    where
        F: FnOnce(Option<&T>) -> Option<T>,
    {
        let mut shared = self.shared.lock();
        match update(shared.latest.as_ref()) {
            Some(value) => {
                Self::deliver(&mut shared, value);
                true
            }
            None => false,
        }
    }

    fn deliver(shared: &mut Shared<T>, value: T) {
        shared
            .observers
            .retain(|observer| observer.send(value.clone()).is_ok());
        shared.latest = Some(value);
        shared.publish_count += 1;
    }

    /// Returns a clone of the latest value.
    pub fn latest(&self) -> Option<T> {
        self.shared.lock().latest.clone()
    }

    /// Subscribes a new observer that first sees the latest value, if any.
    ///
    /// Every publish is queued for the observer until it is consumed, so an
    /// observer that is kept alive must be drained; drop it once it is no
    /// longer read.
    pub fn observe(&self) -> Observer<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut shared = self.shared.lock();
        if let Some(latest) = &shared.latest {
            // Receiver is alive, send cannot fail here
            let _ = sender.send(latest.clone());
        }
        shared.observers.push(sender);
        Observer { receiver }
    }

    /// Number of observers still attached.
    pub fn observer_count(&self) -> usize {
        let mut shared = self.shared.lock();
        shared.observers.retain(|observer| !observer.is_closed());
        shared.observers.len()
    }

    /// Number of publishes since creation.
    pub fn publish_count(&self) -> u64 {
        self.shared.lock().publish_count
    }
}

impl<T: Clone + Send + 'static> Default for StateChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StateChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.shared.lock();
        f.debug_struct("StateChannel")
            .field("latest", &shared.latest)
            .field("observers", &shared.observers.len())
            .field("publish_count", &shared.publish_count)
            .finish()
    }
}

/// One observer's cursor over a `StateChannel`.
///
/// The stream ends once every handle to the channel has been dropped and
/// all delivered values have been consumed.
#[derive(Debug)]
pub struct Observer<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Observer<T> {
    /// Waits for the next value delivered to this observer.
    pub async fn next_value(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Returns an already delivered value without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

impl<T> Stream for Observer<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    use super::*;

    #[test]
    fn test_new_observer_replays_latest() {
        let channel = StateChannel::with_value(1);
        channel.publish(2);
        channel.publish(3);

        let mut observer = channel.observe();
        assert_eq!(observer.try_next(), Some(3));
        assert_eq!(observer.try_next(), None);
    }

    #[test]
    fn test_empty_channel_waits_for_first_publish() {
        let channel: StateChannel<&str> = StateChannel::new();
        let mut observer = channel.observe();

        let mut next = task::spawn(observer.next());
        assert_pending!(next.poll());

        channel.publish("first");
        assert!(next.is_woken());
        assert_ready_eq!(next.poll(), Some("first"));
    }

    #[test]
    fn test_every_publish_delivered_in_order() {
        let channel = StateChannel::with_value(0);
        let mut observer = channel.observe();

        for value in 1..=5 {
            channel.publish(value);
        }

        let seen: Vec<_> = std::iter::from_fn(|| observer.try_next()).collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_observers_have_independent_cursors() {
        let channel = StateChannel::with_value("a");
        let mut early = channel.observe();
        channel.publish("b");
        let mut late = channel.observe();
        channel.publish("c");

        assert_eq!(early.try_next(), Some("a"));
        assert_eq!(early.try_next(), Some("b"));
        assert_eq!(early.try_next(), Some("c"));

        assert_eq!(late.try_next(), Some("b"));
        assert_eq!(late.try_next(), Some("c"));
        assert_eq!(late.try_next(), None);
    }

    #[test]
    fn test_dropped_observers_are_pruned() {
        let channel = StateChannel::with_value(0u8);
        let kept = channel.observe();
        let dropped = channel.observe();
        assert_eq!(channel.observer_count(), 2);

        drop(dropped);
        channel.publish(1);
        assert_eq!(channel.observer_count(), 1);
        drop(kept);
        assert_eq!(channel.observer_count(), 0);
    }

    #[test]
    fn test_unread_observer_queues_until_dropped() {
        let channel = StateChannel::new();
        let mut idle = channel.observe();

        for value in 0..100 {
            channel.publish(value);
        }

        assert_eq!(idle.try_next(), Some(0));
        assert_eq!(std::iter::from_fn(|| idle.try_next()).count(), 99);

        channel.publish(100);
        drop(idle);
        channel.publish(101);
        assert_eq!(channel.observer_count(), 0);
        assert_eq!(channel.latest(), Some(101));
    }

    #[test]
    fn test_publish_with_rejects_update() {
        let channel = StateChannel::with_value(10);
        let mut observer = channel.observe();
        assert_eq!(observer.try_next(), Some(10));

        let published = channel.publish_with(|current| {
            let current = current.copied().unwrap_or_default();
            (current < 5).then_some(current + 1)
        });

        assert!(!published);
        assert_eq!(channel.latest(), Some(10));
        assert_eq!(channel.publish_count(), 0);
        assert_eq!(observer.try_next(), None);
    }

    #[tokio::test]
    async fn test_stream_ends_when_channel_dropped() {
        let channel = StateChannel::with_value(7);
        let observer = channel.observe();
        channel.publish(8);
        drop(channel);

        let values: Vec<_> = observer.collect().await;
        assert_eq!(values, vec![7, 8]);
    }

    #[tokio::test]
    async fn test_publish_from_another_task() {
        let channel = StateChannel::new();
        let mut observer = channel.observe();

        let publisher = channel.clone();
        tokio::spawn(async move {
            publisher.publish(String::from("from task"));
        });

        assert_eq!(observer.next_value().await.as_deref(), Some("from task"));
    }
}
