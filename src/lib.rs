//! # simvisor
//!
//! **Simvisor** is a control-plane gateway for one long-running native
//! simulation process.
//!
//! It starts the simulation on request, feeds it its configuration over
//! stdin, and fans every line the simulation prints out to any number of live
//! observers (browser tabs on `GET /api/stream`). At most one simulation runs
//! at a time.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   POST /api/start      POST /api/stop      GET /api/status      GET /api/stream
//!         │                    │                    │                    │
//!         ▼                    ▼                    ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │  gateway (axum Router)                                                    │
//! └──────┬────────────────────┬────────────────────┬────────────────────┬─────┘
//!        ▼                    ▼                    ▼                    │ attach
//! ┌───────────────────────────────────────────────────────────┐         │
//! │  Supervisor                                               │         │
//! │  - slot: Option<ProcessHandle>  (at most one child)       │         │
//! │  - Bus (broadcast of child output)                        │         │
//! └──────┬──────────────────────────────────────▲─────────────┘         │
//!        │ spawn + stdin script                 │ Log / Error / Complete│
//!        ▼                                      │                       │
//! ┌───────────────────────┐   stdout / stderr   │                       │
//! │  simulation process   │ ────────────────────┘                       │
//! └───────────────────────┘                                             ▼
//!                              Bus ──► registry listener ──► SubscriberRegistry
//!                               │                          ┌────────┼────────┐
//!                               └──► LogWriter             ▼        ▼        ▼
//!                                                     Subscription  ...  Subscription
//!                                                       (SSE)              (SSE)
//! ```
//!
//! ### Lifecycle
//! ```text
//! start ──► validate ──► spawn ──► write DRONE/TASK/START ──► close stdin
//!                          │
//!                          ├──► each stdout line ──► Log
//!                          ├──► each stderr line ──► Error
//!                          └──► exit (or stop) ──► slot cleared ──► Complete{code}
//! ```
//!
//! ## Example
//! ```no_run
//! use simvisor::{AppConfig, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = AppConfig::load(None)?;
//!     let sup = Supervisor::builder(cfg.supervisor()).build();
//!
//!     let app = simvisor::gateway::router(sup, cfg.gateway());
//!     let listener = tokio::net::TcpListener::bind(cfg.listen_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
mod core;
mod error;
mod events;
pub mod gateway;
mod simulation;
mod subscribers;

// ---- Public re-exports ----

pub use config::{AppConfig, Mode};
pub use self::core::{Ack, Config, Status, Supervisor, SupervisorBuilder, wait_for_shutdown_signal};
pub use error::{ConfigError, RequestError, SupervisorError};
pub use events::{Event, EventKind};
pub use simulation::{
    DEFAULT_CHARGING, DEFAULT_DURATION, DEFAULT_LOADING, Drone, Ident, SimulationRequest, Task,
    protocol,
};
pub use subscribers::{LogWriter, SubscriberId, SubscriberRegistry, Subscription};
