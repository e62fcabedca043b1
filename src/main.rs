use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use simvisor::gateway::{self, degraded};
use simvisor::{AppConfig, Mode, Supervisor, wait_for_shutdown_signal};

/// Supervises the simulation process and serves its control API.
#[derive(Debug, Parser)]
#[command(name = "simvisor", version, about)]
struct Cli {
    /// Configuration file (default: ./simvisor.toml if present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Simulation executable.
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Directory of UI assets.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Never spawn; answer control requests with 501.
    #[arg(long)]
    degraded: bool,
}

impl Cli {
    fn apply(self, cfg: &mut AppConfig) {
        if let Some(bind) = self.bind {
            cfg.server.bind = bind;
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(executable) = self.executable {
            cfg.simulation.executable = executable;
        }
        if let Some(dir) = self.static_dir {
            cfg.server.static_dir = Some(dir);
        }
        if self.degraded {
            cfg.simulation.mode = Mode::Degraded;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("simvisor=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut cfg);

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    match cfg.resolve_mode() {
        Mode::Degraded => {
            tracing::info!(%addr, "simvisor listening (degraded: simulation unavailable)");
            let app = degraded::router(cfg.server.static_dir.clone());
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Mode::Supervised | Mode::Auto => {
            let sup = Supervisor::builder(cfg.supervisor()).build();
            tracing::info!(
                %addr,
                executable = %cfg.simulation.executable.display(),
                "simvisor listening"
            );

            let app = gateway::router(Arc::clone(&sup), cfg.gateway());
            let on_signal = Arc::clone(&sup);
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    // open event streams would otherwise hold the server forever
                    on_signal.registry().close_all();
                })
                .await?;

            sup.shutdown().await;
        }
    }

    tracing::info!("simvisor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = wait_for_shutdown_signal().await {
        tracing::error!(error = %e, "failed to install signal handlers");
        std::future::pending::<()>().await;
    }
}
