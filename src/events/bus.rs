//! # Event bus carrying child output.
//!
//! [`Bus`] fans each published [`Event`] out to a fixed set of taps, one
//! unbounded [`tokio::sync::mpsc`] channel per consumer. It is the
//! supervisor's output stream: the child's pump tasks publish into it, and the
//! subscriber registry consumes it through a single listener.
//!
//! ## Architecture
//! ```text
//! Publishers:                          Consumers:
//!   stdout pump ──┐
//!   stderr pump ──┼──────► Bus ──┬───► registry listener ──► SubscriberRegistry::broadcast
//!   exit watcher ─┘   (taps)     └───► LogWriter (optional, mirrors to tracing)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never awaits.
//! - **Lossless**: every tap receives every event published after it was
//!   created; nothing is skipped however far a consumer falls behind.
//! - **One order**: taps are fed under one lock, so all consumers see the same order.
//! - **No persistence**: events published before a tap exists are not replayed.
//! - A tap whose receiver is dropped is removed on the next publish.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::event::Event;

/// Fan-out channel for child output events.
///
/// Cheap to clone; clones publish to the same taps.
#[derive(Clone, Debug, Default)]
pub struct Bus {
    taps: Arc<Mutex<Vec<mpsc::UnboundedSender<Event>>>>,
}

impl Bus {
    /// Creates a bus with no taps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an event to every tap.
    ///
    /// If there are no taps, the event is dropped.
    pub fn publish(&self, ev: Event) {
        self.taps().retain(|tx| tx.send(ev.clone()).is_ok());
    }

    /// Creates a new tap that observes events **published after** this call.
    ///
    /// The receiver ends once every clone of the bus is dropped.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.taps().push(tx);
        rx
    }

    fn taps(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<Event>>> {
        self.taps.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receivers_see_events_in_publish_order() {
        let bus = Bus::new();
        let mut rx = bus.subscribe();

        bus.publish(Event::log("one"));
        bus.publish(Event::log("two"));
        bus.publish(Event::complete(Some(0)));

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::Log { data: "one".into() });
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::Log { data: "two".into() });
        assert!(rx.recv().await.unwrap().is_complete());
    }

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new();
        bus.publish(Event::log("nobody listens"));
    }

    #[tokio::test]
    async fn test_large_burst_reaches_an_idle_receiver_intact() {
        let bus = Bus::new();
        let mut rx = bus.subscribe();

        for i in 0..20_000 {
            bus.publish(Event::log(i.to_string()));
        }
        drop(bus);

        let mut count = 0;
        while let Some(ev) = rx.recv().await {
            assert_eq!(ev.kind, EventKind::Log { data: count.to_string() });
            count += 1;
        }
        assert_eq!(count, 20_000);
    }

    #[test]
    fn test_dropped_receiver_is_removed() {
        let bus = Bus::new();
        let rx = bus.subscribe();
        let _kept = bus.subscribe();
        drop(rx);

        bus.publish(Event::log("prunes"));
        assert_eq!(bus.taps().len(), 1);
    }
}
