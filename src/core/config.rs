//! # Process supervisor configuration.
//!
//! Provides [`Config`], the settings of one [`Supervisor`](crate::Supervisor).
//! The application-level [`AppConfig`](crate::AppConfig) file is converted into
//! this type by [`AppConfig::supervisor`](crate::AppConfig::supervisor).
//!
//! Output queues are unbounded, so there is no capacity to configure.

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the simulation executable.
pub const DEFAULT_PROGRAM: &str = "./drone_scheduler";

/// Configuration for the process supervisor.
///
/// ## Field semantics
/// - `program`: simulation executable
/// - `program_args`: leading arguments placed before the protocol arguments
/// - `grace`: how long a stopped child gets between SIGTERM and SIGKILL, and how long
///   output may keep draining after exit
/// - `log_child_output`: mirror child output into the gateway log
#[derive(Clone, Debug)]
pub struct Config {
    /// Executable to launch for each run.
    pub program: PathBuf,

    /// Arguments inserted before `--charging ...`.
    ///
    /// Lets the core run through a wrapper, e.g. `program = "nice"`,
    /// `program_args = ["-n", "10", "./drone_scheduler"]`.
    pub program_args: Vec<String>,

    /// Termination grace period and output drain limit.
    pub grace: Duration,

    /// Mirror child output into the gateway log.
    pub log_child_output: bool,
}

impl Config {
    /// Default configuration for the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `program = ./drone_scheduler`, no leading args
    /// - `grace = 5s`
    /// - `log_child_output = true`
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            program_args: Vec::new(),
            grace: Duration::from_secs(5),
            log_child_output: true,
        }
    }
}
