//! # Degraded mode: the control endpoints without a simulation.
//!
//! Used where the simulation executable cannot run at all. Every control
//! endpoint answers `501 Not Implemented` with remediation guidance; no request
//! body is read and no process is touched.
//!
//! ```text
//! {"error":"backend_unavailable","message":"...","guidance":{"self_hosting":"...","alternative":"..."}}
//! ```

use std::path::PathBuf;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use serde::Serialize;

const SELF_HOSTING: &str = "Build the simulation core on a Linux or WSL host and run simvisor \
    there in supervised mode, then point the UI at that host.";
const ALTERNATIVE: &str = "Port the simulation core to a runtime available in this deployment \
    (for example WebAssembly).";

/// Fixed 501 answer body.
#[derive(Debug, Clone, Serialize)]
pub struct Unavailable {
    pub error: &'static str,
    pub message: &'static str,
    pub guidance: Guidance,
}

/// How to reach a deployment that can run the simulation.
#[derive(Debug, Clone, Serialize)]
pub struct Guidance {
    pub self_hosting: &'static str,
    pub alternative: &'static str,
}

impl Unavailable {
    fn new(error: &'static str, message: &'static str) -> Self {
        Self {
            error,
            message,
            guidance: Guidance {
                self_hosting: SELF_HOSTING,
                alternative: ALTERNATIVE,
            },
        }
    }
}

impl IntoResponse for Unavailable {
    fn into_response(self) -> Response {
        (StatusCode::NOT_IMPLEMENTED, Json(self)).into_response()
    }
}

async fn start() -> Unavailable {
    Unavailable::new(
        "backend_unavailable",
        "Starting a simulation is not supported in this deployment: the native simulation core cannot run here.",
    )
}

async fn stop() -> Unavailable {
    Unavailable::new(
        "backend_unavailable",
        "Stopping a simulation is not supported in this deployment: the native simulation core cannot run here.",
    )
}

async fn run_simulation() -> Unavailable {
    Unavailable::new(
        "simulation_backend_unavailable",
        "The native simulation core cannot run in this deployment. Self-host the gateway or point the UI at a host that can run the core.",
    )
}

/// Builds the degraded gateway: 501 on every control endpoint, for any method.
pub fn router(static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/api/start", any(start))
        .route("/api/stop", any(stop))
        .route("/api/run-simulation", any(run_simulation));

    super::finish(api, static_dir)
}
