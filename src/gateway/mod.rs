//! # HTTP gateway.
//!
//! Exposes the [`Supervisor`] over HTTP as an axum [`Router`]:
//!
//! | Method | Path          | Answer                                             |
//! |--------|---------------|----------------------------------------------------|
//! | GET    | `/api/status` | `{running, clients}`                               |
//! | POST   | `/api/start`  | `{success, message}` or 400/500 `{error, code}`    |
//! | POST   | `/api/stop`   | `{success, message}` or 400 `{error, code}`        |
//! | GET    | `/api/stream` | `text/event-stream` of [`EventKind`](crate::EventKind) frames |
//!
//! When no simulation can be hosted, [`degraded::router`] answers the control
//! endpoints with 501 instead.
//!
//! Both routers carry request tracing and permissive CORS, and fall back to
//! the static UI directory when one is configured.

pub mod degraded;
mod handlers;
mod response;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::core::Supervisor;

pub use response::ApiError;

/// HTTP-level settings that do not belong to the supervisor.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Interval of SSE comment keep-alives.
    pub keep_alive: Duration,
    /// Directory of UI assets served for every path no route matches.
    pub static_dir: Option<PathBuf>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(15),
            static_dir: None,
        }
    }
}

#[derive(Clone)]
struct AppState {
    sup: Arc<Supervisor>,
    keep_alive: Duration,
}

/// Builds the control gateway for `sup`.
pub fn router(sup: Arc<Supervisor>, opts: GatewayOptions) -> Router {
    let state = AppState {
        sup,
        keep_alive: opts.keep_alive,
    };

    let api = Router::new()
        .route("/api/status", get(handlers::status))
        .route("/api/start", post(handlers::start))
        .route("/api/stop", post(handlers::stop))
        .route("/api/stream", get(handlers::stream))
        .with_state(state);

    finish(api, opts.static_dir)
}

/// Adds static hosting, CORS and request tracing.
fn finish(api: Router, static_dir: Option<PathBuf>) -> Router {
    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    app.layer(CorsLayer::permissive()).layer(trace_layer)
}
