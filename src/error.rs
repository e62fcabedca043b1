//! Error types used by the simvisor runtime and its gateway.
//!
//! This module defines three error enums:
//!
//! - [`SupervisorError`]: errors raised by the process supervisor itself.
//! - [`RequestError`]: reasons a [`SimulationRequest`](crate::SimulationRequest) is rejected.
//! - [`ConfigError`]: failures reading or parsing the configuration file.
//!
//! Supervisor and request errors provide helper methods (`as_label`, `as_message`)
//! for logs and for the `code` field of JSON error bodies.

use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced by the process supervisor.
///
/// None of these change supervisor state: a failed `start` leaves the slot
/// empty (or untouched when already running), a failed `stop` leaves it empty.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The request failed validation; no process was spawned.
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    /// A simulation is already running.
    #[error("Simulation already running")]
    AlreadyRunning,

    /// `stop` was called with no simulation running.
    #[error("No simulation running")]
    NotRunning,

    /// The simulation executable could not be spawned.
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        /// Program that was launched.
        program: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs and API bodies.
    ///
    /// # Example
    /// ```
    /// use simvisor::SupervisorError;
    ///
    /// assert_eq!(SupervisorError::AlreadyRunning.as_label(), "already_running");
    /// assert_eq!(SupervisorError::NotRunning.as_label(), "not_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::InvalidRequest(_) => "invalid_request",
            SupervisorError::AlreadyRunning => "already_running",
            SupervisorError::NotRunning => "not_running",
            SupervisorError::Spawn { .. } => "spawn_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SupervisorError::InvalidRequest(e) => e.as_message(),
            SupervisorError::AlreadyRunning => "Simulation already running".to_string(),
            SupervisorError::NotRunning => "No simulation running".to_string(),
            SupervisorError::Spawn { program, source } => {
                format!("Failed to start simulation executable {}: {source}", program.display())
            }
        }
    }

    /// Indicates whether the caller is at fault (maps to a 4xx answer).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SupervisorError::Spawn { .. })
    }
}

/// # Reasons a simulation request is rejected.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// `drones` was missing or empty.
    #[error("At least one drone is required")]
    NoDrones,

    /// `tasks` was missing or empty.
    #[error("At least one task is required")]
    NoTasks,

    /// A drone entry holds an unusable value.
    #[error("drone #{index}: {reason}")]
    InvalidDrone {
        /// Zero-based position in `drones`.
        index: usize,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A task entry holds an unusable value.
    #[error("task #{index}: {reason}")]
    InvalidTask {
        /// Zero-based position in `tasks`.
        index: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl RequestError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RequestError::NoDrones => "request_no_drones",
            RequestError::NoTasks => "request_no_tasks",
            RequestError::InvalidDrone { .. } => "request_invalid_drone",
            RequestError::InvalidTask { .. } => "request_invalid_task",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors produced while loading the configuration file.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`AppConfig`](crate::AppConfig).
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
