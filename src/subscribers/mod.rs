//! # Observers of the running simulation.
//!
//! This module provides the [`SubscriberRegistry`] (the live set of observer
//! channels), the [`Subscription`] handle each observer reads from, and the
//! [`LogWriter`] that mirrors child output into the gateway's own log.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   child pumps ── publish(Event) ──► Bus ──┬──► registry listener ──► SubscriberRegistry::broadcast
//!                                           │                               │
//!                                           │                 ┌─────────────┼─────────────┐
//!                                           │                 ▼             ▼             ▼
//!                                           │           Subscription   Subscription   Subscription
//!                                           │
//!                                           └──► LogWriter (tracing)
//! ```
//!
//! ## Subscriber lifecycle
//! - created by [`SubscriberRegistry::attach`] when an observer opens the stream
//! - destroyed when its [`Subscription`] is dropped (the observer's connection closed)
//! - never created or destroyed by the process supervisor

mod log;
mod registry;
mod subscription;

pub use log::LogWriter;
pub use registry::{SubscriberId, SubscriberRegistry};
pub use subscription::Subscription;
