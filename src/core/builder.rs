//! # SupervisorBuilder: wires one supervisor together.
//!
//! ```text
//! Bus ──┬──► SubscriberRegistry listener
//!       └──► LogWriter (when `log_child_output`)
//! ```
//! Both taps are created before the supervisor exists, so no child output
//! can be published ahead of them.

use std::sync::Arc;

use crate::{
    core::Config,
    events::Bus,
    subscribers::{LogWriter, SubscriberRegistry},
};
use super::supervisor::Supervisor;

/// Builder for constructing a Supervisor with optional features.
pub struct SupervisorBuilder {
    cfg: Config,
    log_writer: Option<LogWriter>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    ///
    /// Child output is mirrored into the gateway log when
    /// [`Config::log_child_output`] is set.
    pub fn new(cfg: Config) -> Self {
        let log_writer = cfg.log_child_output.then(LogWriter::new);
        Self { cfg, log_writer }
    }

    /// Overrides whether child output is mirrored into the gateway log.
    pub fn with_log_writer(mut self, enabled: bool) -> Self {
        self.log_writer = enabled.then(LogWriter::new);
        self
    }

    /// Builds and returns the Supervisor instance.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// - Event bus for child output
    /// - Subscriber registry and its bus listener
    /// - Optional log writer
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new();

        let registry = SubscriberRegistry::new();
        registry.spawn_listener(bus.subscribe());

        if let Some(writer) = self.log_writer {
            writer.spawn_listener(bus.subscribe());
        }

        Arc::new(Supervisor::new_internal(self.cfg, bus, registry))
    }
}
