//! # SubscriberRegistry: non-blocking fan-out to live observers
//!
//! [`SubscriberRegistry`] holds the channels of every currently attached
//! observer and delivers each broadcast [`Event`] to all of them **without
//! awaiting** any of them.
//!
//! ## Architecture
//! ```text
//! Bus ──► listener ──► broadcast(event)
//!                          │                     (Arc-clone per subscriber)
//!                          ├──► [queue S1] ──► Subscription S1 ──► SSE response 1
//!                          ├──► [queue S2] ──► Subscription S2 ──► SSE response 2
//!                          └──► [queue SN] ──► Subscription SN ──► SSE response N
//! ```
//!
//! ## Rules
//! - **Connected first**: `attach()` queues a `Connected` event for the new
//!   subscriber only, before it can observe any broadcast.
//! - **Per-subscriber FIFO**: each subscriber sees broadcasts in emission order.
//! - **No cross-subscriber ordering**: delivery order across subscribers is
//!   registry order and carries no meaning.
//! - **Non-blocking, lossless**: each subscriber has an unbounded queue, so
//!   `broadcast()` never waits and never drops an event for a live subscriber.
//!   A slow observer only grows its own queue.
//! - **No stale references**: a subscriber is removed when its
//!   [`Subscription`] is dropped; a channel found closed during a broadcast is
//!   pruned on the spot.
//! - The registry never starts or stops the child.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::events::Event;

use super::subscription::Subscription;

/// Identity of one attached observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Per-subscriber channel.
struct SubscriberChannel {
    id: SubscriberId,
    sender: mpsc::UnboundedSender<Arc<Event>>,
}

struct State {
    channels: Vec<SubscriberChannel>,
    closed: bool,
}

/// Live set of observer channels.
pub struct SubscriberRegistry {
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                channels: Vec::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
        })
    }

    /// Spawns the single listener that forwards bus events to every subscriber.
    ///
    /// Call once during supervisor construction. Exits when the bus is dropped.
    pub fn spawn_listener(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<Event>) {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                me.broadcast(ev);
            }
        });
    }

    /// Attaches a new observer and queues its `Connected` event.
    ///
    /// The returned [`Subscription`] detaches itself when dropped.
    pub fn attach(self: &Arc<Self>) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel::<Arc<Event>>();
        // `rx` is alive here.
        let _ = tx.send(Arc::new(Event::connected()));

        let mut state = self.state();
        if state.closed {
            tracing::debug!(subscriber = %id, "registry closed; subscription ends after connect");
        } else {
            state.channels.push(SubscriberChannel { id, sender: tx });
        }
        drop(state);

        Subscription::new(id, rx, Arc::downgrade(self))
    }

    /// Removes a subscriber. Returns `false` if it was not attached.
    pub fn detach(&self, id: SubscriberId) -> bool {
        let mut state = self.state();
        let before = state.channels.len();
        state.channels.retain(|ch| ch.id != id);
        before != state.channels.len()
    }

    /// Delivers `event` to every attached subscriber, in registry order.
    ///
    /// Failure to deliver to one subscriber never affects the others and is not
    /// reported to the caller.
    pub fn broadcast(&self, event: Event) {
        let ev = Arc::new(event);
        let mut state = self.state();
        state.channels.retain(|ch| match ch.sender.send(Arc::clone(&ev)) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(subscriber = %ch.id, event = ev.label(), "pruned closed subscriber");
                false
            }
        });
    }

    /// Number of attached subscribers.
    pub fn len(&self) -> usize {
        self.state().channels.len()
    }

    /// True if nobody is attached.
    pub fn is_empty(&self) -> bool {
        self.state().channels.is_empty()
    }

    /// Drops every subscriber channel, ending all subscriptions.
    ///
    /// Later attachments receive `Connected` and end immediately.
    pub fn close_all(&self) {
        let mut state = self.state();
        state.closed = true;
        let n = state.channels.len();
        state.channels.clear();
        tracing::debug!(subscribers = n, "closed all subscribers");
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Bus, EventKind};
    use futures::StreamExt;
    use std::time::Duration;

    fn log_data(ev: &Event) -> &str {
        match &ev.kind {
            EventKind::Log { data } => data,
            other => panic!("expected log event, got {other:?}"),
        }
    }

    #[test]
    fn test_attach_queues_connected_only_for_newcomer() {
        let reg = SubscriberRegistry::new();
        let mut first = reg.attach();
        assert_eq!(first.try_next().unwrap().kind, EventKind::Connected);

        let mut second = reg.attach();
        assert_eq!(second.try_next().unwrap().kind, EventKind::Connected);
        assert!(first.try_next().is_none());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_all_subscribers_see_all_broadcasts_in_order() {
        let reg = SubscriberRegistry::new();
        let mut subs: Vec<_> = (0..4).map(|_| reg.attach()).collect();

        for i in 0..10 {
            reg.broadcast(Event::log(format!("line {i}")));
        }

        for sub in &mut subs {
            assert_eq!(sub.try_next().unwrap().kind, EventKind::Connected);
            for i in 0..10 {
                let ev = sub.try_next().unwrap();
                assert_eq!(log_data(&ev), format!("line {i}"));
            }
            assert!(sub.try_next().is_none());
        }
    }

    #[test]
    fn test_detached_subscriber_misses_later_broadcasts() {
        let reg = SubscriberRegistry::new();
        let mut stays = reg.attach();
        let leaves = reg.attach();
        let leaving_id = leaves.id();

        reg.broadcast(Event::log("before"));
        drop(leaves);
        assert_eq!(reg.len(), 1);
        assert!(!reg.detach(leaving_id));

        reg.broadcast(Event::log("after"));

        stays.try_next();
        assert_eq!(log_data(&stays.try_next().unwrap()), "before");
        assert_eq!(log_data(&stays.try_next().unwrap()), "after");
    }

    #[test]
    fn test_closed_channel_pruned_without_affecting_others() {
        let reg = SubscriberRegistry::new();
        let mut healthy = reg.attach();

        // A channel whose receiving side vanished without a detach.
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        reg.state().channels.insert(
            0,
            SubscriberChannel {
                id: SubscriberId(999),
                sender: tx,
            },
        );
        assert_eq!(reg.len(), 2);

        reg.broadcast(Event::log("still delivered"));

        assert_eq!(reg.len(), 1);
        healthy.try_next();
        assert_eq!(log_data(&healthy.try_next().unwrap()), "still delivered");
    }

    #[test]
    fn test_unread_subscriber_keeps_every_event() {
        let reg = SubscriberRegistry::new();
        let mut slow = reg.attach();
        let mut fresh = None;

        for i in 0..20_000 {
            reg.broadcast(Event::log(i.to_string()));
            if i == 9_999 {
                fresh = Some(reg.attach());
            }
        }

        assert_eq!(slow.try_next().unwrap().kind, EventKind::Connected);
        for i in 0..20_000 {
            assert_eq!(log_data(&slow.try_next().unwrap()), i.to_string());
        }
        assert!(slow.try_next().is_none());

        let mut fresh = fresh.unwrap();
        assert_eq!(fresh.try_next().unwrap().kind, EventKind::Connected);
        assert_eq!(log_data(&fresh.try_next().unwrap()), "10000");
    }

    #[tokio::test]
    async fn test_close_all_ends_streams() {
        let reg = SubscriberRegistry::new();
        let mut sub = reg.attach();
        reg.close_all();
        assert!(reg.is_empty());

        assert!(sub.next().await.is_some());
        assert!(sub.next().await.is_none());

        let mut late = reg.attach();
        assert!(late.next().await.is_some());
        assert!(late.next().await.is_none());
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn test_listener_forwards_bus_events() {
        let bus = Bus::new();
        let reg = SubscriberRegistry::new();
        reg.spawn_listener(bus.subscribe());

        let mut a = reg.attach();
        let mut b = reg.attach();
        bus.publish(Event::log("from child"));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.next().await.unwrap().kind, EventKind::Connected);
            let ev = tokio::time::timeout(Duration::from_secs(1), sub.next())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(log_data(&ev), "from child");
        }
    }
}
