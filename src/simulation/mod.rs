//! Simulation input: the request model and its translation to the line protocol.
//!
//! - [`SimulationRequest`], [`Drone`], [`Task`], [`Ident`]: JSON body of a start request
//! - [`protocol`]: process arguments and stdin script for the simulation executable

pub mod protocol;
mod request;

pub use request::{
    DEFAULT_CHARGING, DEFAULT_DURATION, DEFAULT_LOADING, Drone, Ident, SimulationRequest, Task,
};
