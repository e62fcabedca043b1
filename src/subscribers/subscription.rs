//! # Observer-side handle of an attached subscriber.
//!
//! A [`Subscription`] is a [`Stream`] of events for one observer. It is the
//! only owner of the observer's receiving queue; dropping it (for example when
//! axum drops an SSE body because the client went away) detaches the
//! subscriber from the registry.

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::events::Event;

use super::registry::{SubscriberId, SubscriberRegistry};

/// Stream of events delivered to one observer.
///
/// Ends when the registry closes all subscribers or is dropped.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<Arc<Event>>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub(super) fn new(
        id: SubscriberId,
        rx: mpsc::UnboundedReceiver<Arc<Event>>,
        registry: Weak<SubscriberRegistry>,
    ) -> Self {
        Self { id, rx, registry }
    }

    /// Identity of this subscriber in the registry.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.rx.recv().await
    }

    /// Takes the next queued event without waiting.
    pub fn try_next(&mut self) -> Option<Arc<Event>> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Arc<Event>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.detach(self.id) {
                tracing::debug!(subscriber = %self.id, "subscriber detached");
            }
        }
    }
}
