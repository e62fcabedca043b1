//! Observer events: types and the supervisor's output bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] lossless fan-out over unbounded `tokio::sync::mpsc` taps
//!
//! ## Quick reference
//! - **Publishers**: the child's stdout/stderr pumps and its exit watcher
//!   (`core::child`); `SubscriberRegistry::attach` creates `Connected` events
//!   directly for the attaching subscriber.
//! - **Consumers**: the registry listener (fans out to subscribers) and
//!   `LogWriter`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
