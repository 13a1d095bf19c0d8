//! # Single-Consumption Events
//!
//! A value wrapper that is meaningfully delivered at most once. Every
//! state-setting call publishes a fresh [`Event`]; the first observer to
//! [`take`](Event::take) it flips the delivered flag, and later observers see
//! it as already handled.
//!
//! [`EventCell`] holds the latest event on a `watch` channel so late
//! subscribers can still observe it. Whether they get the value is a policy
//! chosen per subscription:
//!
//! - [`ReplayPolicy::SkipDelivered`] only yields events nobody has taken yet
//! - [`ReplayPolicy::Always`] replays the latest value even if it was taken
//!
//! ```
//! use core_playback::event::{EventCell, ReplayPolicy};
//!
//! let cell = EventCell::new();
//! cell.publish(30_i64);
//!
//! let mut first = cell.subscribe(ReplayPolicy::SkipDelivered);
//! let mut late = cell.subscribe(ReplayPolicy::SkipDelivered);
//! assert_eq!(first.try_next(), Some(30));
//! assert_eq!(late.try_next(), None);
//! ```

use core_async::sync::watch;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// One published value plus its delivered flag.
#[derive(Debug)]
pub struct Event<T> {
    value: T,
    sequence: u64,
    delivered: AtomicBool,
}

impl<T> Event<T> {
    fn new(value: T, sequence: u64) -> Self {
        Self {
            value,
            sequence,
            delivered: AtomicBool::new(false),
        }
    }

    /// Returns the value on first access only.
    pub fn take(&self) -> Option<&T> {
        if self.delivered.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(&self.value)
        }
    }

    /// Reads the value without consuming it.
    pub fn peek(&self) -> &T {
        &self.value
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }

    /// Position of this event in its cell's publication order (starts at 1).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// How a subscription treats an event that was already delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    #[default]
    SkipDelivered,
    Always,
}

/// Latest-value holder for single-consumption events.
#[derive(Debug)]
pub struct EventCell<T> {
    sender: watch::Sender<Option<Arc<Event<T>>>>,
    sequence: AtomicU64,
}

impl<T> Default for EventCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventCell<T> {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Replaces the current event with a fresh, undelivered one.
    ///
    /// Returns the new event's sequence number.
    pub fn publish(&self, value: T) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        self.sender
            .send_replace(Some(Arc::new(Event::new(value, sequence))));
        sequence
    }

    /// The most recent event, delivered or not.
    pub fn latest(&self) -> Option<Arc<Event<T>>> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self, policy: ReplayPolicy) -> EventSubscription<T> {
        let receiver = self.sender.subscribe();
        EventSubscription {
            receiver,
            policy,
            pending_initial: true,
        }
    }
}

impl<T: Clone> EventCell<T> {
    /// Clones the latest value without marking it delivered.
    pub fn peek_value(&self) -> Option<T> {
        self.sender
            .borrow()
            .as_ref()
            .map(|event| event.peek().clone())
    }
}

/// A stream of single-consumption values from one [`EventCell`].
#[derive(Debug)]
pub struct EventSubscription<T> {
    receiver: watch::Receiver<Option<Arc<Event<T>>>>,
    policy: ReplayPolicy,
    pending_initial: bool,
}

impl<T: Clone> EventSubscription<T> {
    /// Waits for the next value this subscription is allowed to see.
    ///
    /// Returns `None` once the owning cell is dropped.
    pub async fn next(&mut self) -> Option<T> {
        if let Some(value) = self.try_next() {
            return Some(value);
        }

        loop {
            self.receiver.changed().await.ok()?;
            let event = self.receiver.borrow_and_update().clone();
            if let Some(value) = event.and_then(|event| self.accept(&event)) {
                return Some(value);
            }
        }
    }

    /// Returns a pending value without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        let current = if self.pending_initial {
            self.pending_initial = false;
            self.receiver.borrow_and_update().clone()
        } else if self.receiver.has_changed().unwrap_or(false) {
            self.receiver.borrow_and_update().clone()
        } else {
            None
        };

        current.and_then(|event| self.accept(&event))
    }

    fn accept(&self, event: &Event<T>) -> Option<T> {
        match (event.take(), self.policy) {
            (Some(value), _) => Some(value.clone()),
            (None, ReplayPolicy::Always) => Some(event.peek().clone()),
            (None, ReplayPolicy::SkipDelivered) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_async::time::{sleep, Duration};

    #[test]
    fn take_flips_delivered_once() {
        let event = Event::new(5, 1);
        assert!(!event.is_delivered());
        assert_eq!(event.take(), Some(&5));
        assert_eq!(event.take(), None);
        assert!(event.is_delivered());
        assert_eq!(*event.peek(), 5);
    }

    #[test]
    fn late_observer_sees_nothing_after_delivery() {
        let cell = EventCell::new();
        cell.publish(7_i64);

        let mut early = cell.subscribe(ReplayPolicy::SkipDelivered);
        assert_eq!(early.try_next(), Some(7));

        let mut late = cell.subscribe(ReplayPolicy::SkipDelivered);
        assert_eq!(late.try_next(), None);
    }

    #[test]
    fn replay_policy_always_returns_delivered_value() {
        let cell = EventCell::new();
        cell.publish("song");
        assert_eq!(cell.latest().and_then(|e| e.take().copied()), Some("song"));

        let mut replay = cell.subscribe(ReplayPolicy::Always);
        assert_eq!(replay.try_next(), Some("song"));
    }

    #[test]
    fn each_publish_is_a_fresh_event() {
        let cell = EventCell::new();
        assert_eq!(cell.publish(1), 1);
        let first = cell.latest().unwrap();
        first.take();

        assert_eq!(cell.publish(1), 2);
        let second = cell.latest().unwrap();
        assert!(!second.is_delivered());
        assert_eq!(second.sequence(), 2);
        assert_eq!(cell.peek_value(), Some(1));
    }

    #[core_async::test]
    async fn next_waits_for_publication() {
        let cell = Arc::new(EventCell::new());
        let mut sub = cell.subscribe(ReplayPolicy::SkipDelivered);
        assert_eq!(sub.try_next(), None);

        let publisher = cell.clone();
        core_async::task::spawn(async move {
            sleep(Duration::from_millis(5)).await;
            publisher.publish(42_u32);
        });

        assert_eq!(sub.next().await, Some(42));
    }

    #[core_async::test]
    async fn next_ends_when_cell_dropped() {
        let cell = EventCell::<u8>::new();
        let mut sub = cell.subscribe(ReplayPolicy::Always);
        drop(cell);
        assert_eq!(sub.next().await, None);
    }
}
