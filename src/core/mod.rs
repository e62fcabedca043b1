//! Runtime core: the simulation process and its lifecycle.
//!
//! The public API from this module is [`Supervisor`], which owns the single
//! process slot, and its [`Config`].
//!
//! Internal modules:
//! - [`supervisor`]: the process slot, start/stop/status and exit reporting;
//! - [`child`]: spawning, feeding and pumping one child;
//! - [`builder`]: wires the bus, registry and log writer together;
//! - [`shutdown`]: termination signal handling.

mod builder;
mod child;
mod config;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{Config, DEFAULT_PROGRAM};
pub use shutdown::wait_for_shutdown_signal;
pub use supervisor::{Ack, Status, Supervisor};
