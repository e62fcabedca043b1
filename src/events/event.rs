//! # Events delivered to observers.
//!
//! The [`EventKind`] enum classifies what an observer sees:
//! - **Connection**: [`EventKind::Connected`], sent once to a freshly attached subscriber only
//! - **Output**: [`EventKind::Log`] (stdout line) and [`EventKind::Error`] (stderr line)
//! - **Terminal**: [`EventKind::Complete`], the child exited (any code)
//!
//! The [`Event`] struct adds a sequence number and a timestamp.
//!
//! ## Wire form
//! Only the kind is serialized; it is what the UI consumes:
//! ```text
//! {"type":"connected"}
//! {"type":"log","data":"Drone 1 picked up task 3"}
//! {"type":"error","data":"Warning: Malformed DRONE line 2"}
//! {"type":"complete","code":0}
//! ```
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events of one child are published in emission order, so their `seq` order is their
//! emission order.
//!
//! ## Example
//! ```rust
//! use simvisor::{Event, EventKind};
//!
//! let ev = Event::log("Drone 1 charging");
//! assert_eq!(ev.kind, EventKind::Log { data: "Drone 1 charging".into() });
//! assert_eq!(ev.to_json(), r#"{"type":"log","data":"Drone 1 charging"}"#);
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde::Serialize;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification and payload of an observer event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventKind {
    /// Subscriber attached. Never broadcast.
    Connected,

    /// One line written by the child to stdout.
    Log { data: String },

    /// One line written by the child to stderr. Not fatal to the supervisor.
    Error { data: String },

    /// The child exited.
    ///
    /// `code` is `None` when the child was terminated by a signal
    /// (the explicit-stop path).
    Complete { code: Option<i32> },
}

/// Observer event with ordering metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification and payload.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
        }
    }

    #[inline]
    pub fn connected() -> Self {
        Self::new(EventKind::Connected)
    }

    #[inline]
    pub fn log(data: impl Into<String>) -> Self {
        Self::new(EventKind::Log { data: data.into() })
    }

    #[inline]
    pub fn error(data: impl Into<String>) -> Self {
        Self::new(EventKind::Error { data: data.into() })
    }

    #[inline]
    pub fn complete(code: Option<i32>) -> Self {
        Self::new(EventKind::Complete { code })
    }

    /// Short stable label of the kind (matches the wire `type`).
    pub fn label(&self) -> &'static str {
        match self.kind {
            EventKind::Connected => "connected",
            EventKind::Log { .. } => "log",
            EventKind::Error { .. } => "error",
            EventKind::Complete { .. } => "complete",
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self.kind, EventKind::Complete { .. })
    }

    /// JSON wire form of the kind.
    pub fn to_json(&self) -> String {
        // A tagged enum of strings and integers always serializes.
        serde_json::to_string(&self.kind).unwrap_or_default()
    }
}
