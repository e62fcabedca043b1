//! # Simulation request: the body of `POST /api/start`.
//!
//! ```json
//! {
//!   "drones":  [{ "speed": 10, "battery": 100 }],
//!   "tasks":   [{ "warehouse": "W1", "customer": "C1", "priority": 1, "estimatedTime": 5 }],
//!   "charging": 3, "loading": 5, "duration": 40
//! }
//! ```
//!
//! Missing `drones`/`tasks` deserialize as empty and are rejected by
//! [`SimulationRequest::validate`]; missing scalars take their defaults.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RequestError;

/// Default number of charging stations.
pub const DEFAULT_CHARGING: u32 = 3;
/// Default number of loading bays.
pub const DEFAULT_LOADING: u32 = 5;
/// Default simulated duration.
pub const DEFAULT_DURATION: u32 = 40;

/// Parameters for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    /// Drone fleet, in submission order.
    #[serde(default)]
    pub drones: Vec<Drone>,
    /// Delivery tasks, in submission order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Charging stations.
    #[serde(default = "default_charging")]
    pub charging: u32,
    /// Loading bays.
    #[serde(default = "default_loading")]
    pub loading: u32,
    /// Simulated duration.
    #[serde(default = "default_duration")]
    pub duration: u32,
}

fn default_charging() -> u32 {
    DEFAULT_CHARGING
}

fn default_loading() -> u32 {
    DEFAULT_LOADING
}

fn default_duration() -> u32 {
    DEFAULT_DURATION
}

/// One drone of the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub speed: f64,
    pub battery: f64,
}

/// One delivery task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub warehouse: Ident,
    pub customer: Ident,
    pub priority: f64,
    pub estimated_time: f64,
}

/// Location identifier; accepts a JSON string or integer and is written verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ident(String);

impl Ident {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Ident {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdentVisitor;

        impl Visitor<'_> for IdentVisitor {
            type Value = Ident;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer identifier")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Ident, E> {
                Ok(Ident::new(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Ident, E> {
                Ok(Ident(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Ident, E> {
                Ok(Ident(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Ident, E> {
                Ok(Ident(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdentVisitor)
    }
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self {
            drones: Vec::new(),
            tasks: Vec::new(),
            charging: DEFAULT_CHARGING,
            loading: DEFAULT_LOADING,
            duration: DEFAULT_DURATION,
        }
    }
}

impl SimulationRequest {
    /// Checks the request can be written to the line protocol.
    ///
    /// Empty sequences are rejected first (drones before tasks), then each entry
    /// in order; the first problem found is returned.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.drones.is_empty() {
            return Err(RequestError::NoDrones);
        }
        if self.tasks.is_empty() {
            return Err(RequestError::NoTasks);
        }

        for (index, drone) in self.drones.iter().enumerate() {
            let reason = if !positive(drone.speed) {
                "speed must be a positive number"
            } else if !positive(drone.battery) {
                "battery must be a positive number"
            } else {
                continue;
            };
            return Err(RequestError::InvalidDrone { index, reason });
        }

        for (index, task) in self.tasks.iter().enumerate() {
            let reason = if let Some(reason) = check_warehouse(&task.warehouse) {
                reason
            } else if let Some(reason) = check_customer(&task.customer) {
                reason
            } else if !task.priority.is_finite() {
                "priority must be a finite number"
            } else if !positive(task.estimated_time) {
                "estimatedTime must be a positive number"
            } else {
                continue;
            };
            return Err(RequestError::InvalidTask { index, reason });
        }

        Ok(())
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

// The simulation core splits TASK lines on spaces: the warehouse is the first
// token, the customer spans everything up to the last two tokens.
fn check_warehouse(id: &Ident) -> Option<&'static str> {
    if id.as_str().is_empty() {
        Some("warehouse must not be empty")
    } else if id.as_str().chars().any(char::is_whitespace) {
        Some("warehouse must not contain whitespace")
    } else {
        None
    }
}

fn check_customer(id: &Ident) -> Option<&'static str> {
    if id.as_str().trim().is_empty() {
        Some("customer must not be empty")
    } else if id.as_str().contains(['\n', '\r']) {
        Some("customer must not contain line breaks")
    } else {
        None
    }
}
