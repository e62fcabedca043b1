//! # Supervisor: owns the single simulation process slot.
//!
//! The [`Supervisor`] owns the output [`Bus`], the [`SubscriberRegistry`] and
//! the process slot. It starts at most one child at a time, feeds it the
//! configuration script, and turns its output and exit into events.
//!
//! ## High-level architecture
//! ```text
//! start(req):
//!   validate ──► lock slot ──► (occupied? AlreadyRunning)
//!            ──► child::spawn ──► feed(stdin) / pump(stdout) / pump(stderr)
//!            ──► spawn watcher(run) ──► slot = Some(handle{run})
//!
//! watcher(run):
//!   wait_or_stop ──► drain pumps ──► release(run) ──► publish Complete{code}
//!
//! stop():
//!   lock slot ──► take handle (empty? NotRunning) ──► cancel(run)   (no wait)
//!
//! Event flow:
//!   pumps / watcher ── publish ──► Bus ──► registry listener ──► SubscriberRegistry::broadcast
//! ```
//!
//! ## Rules
//! - `running` is exactly "the slot holds a handle"; there is no other flag.
//! - The slot is cleared by `stop` (immediately) or by the watcher of the same
//!   run (on exit). A watcher never clears the handle of a newer run.
//! - `Complete` is published after the slot is released, so an observer
//!   reacting to it sees `running: false` unless a new run has already started.
//! - `stop` does not wait for the child. The child gets SIGTERM, and SIGKILL
//!   only if it is still alive after `grace`; its `Complete` follows with the
//!   exit code it chose, or `null` when a signal ended it.
//! - Output is never dropped: every observer attached during a run sees every
//!   line of it.
//!
//! ## Example
//! ```no_run
//! use futures::StreamExt;
//! use simvisor::{Config, Drone, SimulationRequest, Supervisor, Task};
//!
//! # async fn demo() -> Result<(), simvisor::SupervisorError> {
//! let sup = Supervisor::builder(Config::new("./drone_scheduler")).build();
//! let mut observer = sup.subscribe();
//!
//! sup.start(SimulationRequest {
//!     drones: vec![Drone { speed: 1.0, battery: 100.0 }],
//!     tasks: vec![Task {
//!         warehouse: "A".into(),
//!         customer: "C101".into(),
//!         priority: 2.0,
//!         estimated_time: 10.0,
//!     }],
//!     ..Default::default()
//! })
//! .await?;
//!
//! while let Some(ev) = observer.next().await {
//!     println!("{}", ev.to_json());
//!     if ev.is_complete() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SupervisorError;
use crate::events::{Bus, Event};
use crate::simulation::{SimulationRequest, protocol};
use crate::subscribers::{SubscriberRegistry, Subscription};

use super::builder::SupervisorBuilder;
use super::child::{self, Output};
use super::config::Config;

/// The live child of the current run.
struct ProcessHandle {
    /// Run id, unique per supervisor.
    run: u64,
    pid: Option<u32>,
    /// Asks the run's watcher to stop the child.
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
    started_at: Instant,
}

/// Snapshot answered by `GET /api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    /// A simulation process is held.
    pub running: bool,
    /// Attached observers.
    pub clients: usize,
}

/// Successful acknowledgement of `start` / `stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: &'static str,
}

impl Ack {
    fn new(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

/// Owns the single simulation process and the observers of its output.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    registry: Arc<SubscriberRegistry>,
    slot: Mutex<Option<ProcessHandle>>,
    runs: AtomicU64,
}

impl Supervisor {
    /// Returns a builder for a new supervisor.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(super) fn new_internal(cfg: Config, bus: Bus, registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            cfg,
            bus,
            registry,
            slot: Mutex::new(None),
            runs: AtomicU64::new(0),
        }
    }

    /// Starts a simulation run.
    ///
    /// Fails with [`SupervisorError::InvalidRequest`] before anything else is
    /// checked, with [`SupervisorError::AlreadyRunning`] if a process is held,
    /// and with [`SupervisorError::Spawn`] if the executable cannot be launched.
    /// On success the child is running and its configuration is being written.
    pub async fn start(self: &Arc<Self>, req: SimulationRequest) -> Result<Ack, SupervisorError> {
        req.validate()?;

        let mut slot = self.slot.lock().await;
        if let Some(current) = slot.as_ref() {
            tracing::debug!(run = current.run, "start rejected: simulation already running");
            return Err(SupervisorError::AlreadyRunning);
        }

        let mut proc = child::spawn(&self.cfg, &req).inspect_err(|e| {
            tracing::warn!(program = %self.cfg.program.display(), error = %e, "failed to spawn simulation");
        })?;
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let pid = proc.id();

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = proc.stdout.take() {
            pumps.push(child::pump(stdout, Output::Stdout, self.bus.clone(), run));
        }
        if let Some(stderr) = proc.stderr.take() {
            pumps.push(child::pump(stderr, Output::Stderr, self.bus.clone(), run));
        }
        if let Some(stdin) = proc.stdin.take() {
            child::feed(stdin, protocol::script(&req), run);
        }

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(Arc::clone(self).watch(run, proc, pumps, cancel.clone()));

        *slot = Some(ProcessHandle {
            run,
            pid,
            cancel,
            watcher,
            started_at: Instant::now(),
        });
        drop(slot);

        tracing::info!(
            run,
            pid = ?pid,
            drones = req.drones.len(),
            tasks = req.tasks.len(),
            charging = req.charging,
            loading = req.loading,
            duration = req.duration,
            "simulation started"
        );
        Ok(Ack::new("Simulation started"))
    }

    /// Signals the running child to terminate and clears the slot at once.
    ///
    /// Does not wait for the child to exit; the run's `Complete` event follows.
    pub async fn stop(&self) -> Result<Ack, SupervisorError> {
        let handle = self
            .slot
            .lock()
            .await
            .take()
            .ok_or(SupervisorError::NotRunning)?;

        handle.cancel.cancel();
        tracing::info!(
            run = handle.run,
            pid = ?handle.pid,
            uptime_ms = handle.started_at.elapsed().as_millis() as u64,
            "simulation stop requested"
        );
        Ok(Ack::new("Simulation stopped"))
    }

    /// Current run state and observer count. No side effects.
    pub async fn status(&self) -> Status {
        Status {
            running: self.is_running().await,
            clients: self.registry.len(),
        }
    }

    /// True while a process is held.
    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Attaches a new observer.
    pub fn subscribe(&self) -> Subscription {
        self.registry.attach()
    }

    /// The observer registry.
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Stops the running child (if any) and waits for its exit to be reported.
    ///
    /// The wait covers the SIGTERM grace, a SIGKILL and the output drain.
    pub async fn shutdown(&self) {
        let Some(handle) = self.slot.lock().await.take() else {
            return;
        };

        handle.cancel.cancel();
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace * 3, handle.watcher).await {
            Ok(_) => tracing::info!(run = handle.run, "simulation stopped for shutdown"),
            Err(_) => tracing::warn!(run = handle.run, ?grace, "simulation did not exit within grace"),
        }
    }

    /// Observes one run until its exit has been broadcast.
    async fn watch(
        self: Arc<Self>,
        run: u64,
        mut proc: Child,
        pumps: Vec<JoinHandle<()>>,
        cancel: CancellationToken,
    ) {
        let code = child::wait_or_stop(&mut proc, &cancel, self.cfg.grace, run).await;
        child::drain(pumps, self.cfg.grace, run).await;

        self.release(run).await;
        tracing::info!(run, code = ?code, "simulation exited");
        self.bus.publish(Event::complete(code));
    }

    /// Clears the slot if it still belongs to `run`.
    async fn release(&self, run: u64) {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|h| h.run == run) {
            *slot = None;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::simulation::{Drone, Task};
    use futures::StreamExt;
    use std::time::Duration;

    /// Runs `script` through `/bin/sh -c`; protocol args land in `"$@"`.
    fn sh(script: &str) -> Config {
        Config {
            program: "/bin/sh".into(),
            program_args: vec!["-c".into(), script.into(), "simulation".into()],
            grace: Duration::from_secs(5),
            log_child_output: false,
            ..Config::default()
        }
    }

    fn request() -> SimulationRequest {
        SimulationRequest {
            drones: vec![Drone {
                speed: 10.0,
                battery: 100.0,
            }],
            tasks: vec![Task {
                warehouse: "W1".into(),
                customer: "C1".into(),
                priority: 1.0,
                estimated_time: 5.0,
            }],
            ..Default::default()
        }
    }

    async fn next(sub: &mut Subscription) -> EventKind {
        let ev = tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .expect("timed out waiting for event")
            .expect("subscription ended");
        ev.kind.clone()
    }

    /// Collects events up to and including the next `Complete`.
    async fn until_complete(sub: &mut Subscription) -> Vec<EventKind> {
        let mut seen = Vec::new();
        loop {
            let kind = next(sub).await;
            let done = matches!(kind, EventKind::Complete { .. });
            seen.push(kind);
            if done {
                return seen;
            }
        }
    }

    fn log(s: &str) -> EventKind {
        EventKind::Log { data: s.into() }
    }

    #[tokio::test]
    async fn test_child_receives_protocol_and_run_completes() {
        let sup = Supervisor::builder(sh(r#"echo "$@"; cat"#)).build();
        let mut sub = sup.subscribe();
        assert_eq!(next(&mut sub).await, EventKind::Connected);

        let ack = sup.start(request()).await.unwrap();
        assert_eq!(ack, Ack::new("Simulation started"));

        assert_eq!(
            until_complete(&mut sub).await,
            vec![
                log("--charging 3 --loading 5 --duration 40 --config stdin"),
                log("DRONE 10 100"),
                log("TASK W1 C1 1 5"),
                log("START"),
                EventKind::Complete { code: Some(0) },
            ]
        );

        assert_eq!(
            sup.status().await,
            Status {
                running: false,
                clients: 1
            }
        );
        assert!(sup.start(request()).await.is_ok());
        until_complete(&mut sub).await;
    }

    #[tokio::test]
    async fn test_every_observer_gets_the_same_log() {
        let sup = Supervisor::builder(sh("echo hello")).build();
        let mut a = sup.subscribe();
        let mut b = sup.subscribe();

        sup.start(request()).await.unwrap();

        for sub in [&mut a, &mut b] {
            assert_eq!(next(sub).await, EventKind::Connected);
            assert_eq!(
                until_complete(sub).await,
                vec![log("hello"), EventKind::Complete { code: Some(0) }]
            );
        }
    }

    #[tokio::test]
    async fn test_second_start_rejected_until_stopped() {
        let sup = Supervisor::builder(sh("exec sleep 30")).build();
        let mut sub = sup.subscribe();
        next(&mut sub).await;

        sup.start(request()).await.unwrap();
        assert!(matches!(
            sup.start(request()).await,
            Err(SupervisorError::AlreadyRunning)
        ));
        assert!(sup.is_running().await);

        assert_eq!(sup.stop().await.unwrap().message, "Simulation stopped");
        assert!(!sup.is_running().await);
        assert!(matches!(sup.stop().await, Err(SupervisorError::NotRunning)));

        assert_eq!(
            until_complete(&mut sub).await,
            vec![EventKind::Complete { code: None }]
        );
    }

    #[tokio::test]
    async fn test_invalid_request_spawns_nothing() {
        let sup = Supervisor::builder(Config::new("/definitely/not/a/simulation")).build();
        let mut req = request();
        req.drones.clear();

        let err = sup.start(req).await.unwrap_err();
        assert_eq!(err.as_label(), "invalid_request");
        assert!(!sup.is_running().await);
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_slot_empty() {
        let sup = Supervisor::builder(Config::new("/definitely/not/a/simulation")).build();

        let err = sup.start(request()).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert!(!sup.is_running().await);
        assert!(matches!(sup.stop().await, Err(SupervisorError::NotRunning)));
    }

    #[tokio::test]
    async fn test_stderr_and_nonzero_exit_are_reported() {
        let sup = Supervisor::builder(sh("echo oops >&2; exit 3")).build();
        let mut sub = sup.subscribe();
        next(&mut sub).await;

        sup.start(request()).await.unwrap();

        assert_eq!(
            until_complete(&mut sub).await,
            vec![
                EventKind::Error { data: "oops".into() },
                EventKind::Complete { code: Some(3) },
            ]
        );
        assert!(!sup.is_running().await);
    }

    #[tokio::test]
    async fn test_stale_exit_does_not_clear_newer_run() {
        let sup = Supervisor::builder(sh("exec sleep 30")).build();
        let mut sub = sup.subscribe();
        next(&mut sub).await;

        sup.start(request()).await.unwrap();
        sup.stop().await.unwrap();
        sup.start(request()).await.unwrap();

        assert_eq!(
            until_complete(&mut sub).await,
            vec![EventKind::Complete { code: None }]
        );
        assert!(sup.is_running().await);

        sup.stop().await.unwrap();
        until_complete(&mut sub).await;
        assert!(!sup.is_running().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_output_burst_reaches_observer_in_full() {
        let script = r#"i=0; while [ "$i" -lt 20000 ]; do echo "$i"; i=$((i+1)); done"#;
        let sup = Supervisor::builder(sh(script)).build();
        let mut sub = sup.subscribe();
        next(&mut sub).await;

        sup.start(request()).await.unwrap();

        let seen = until_complete(&mut sub).await;
        assert_eq!(seen.len(), 20_001);
        for (i, kind) in seen[..20_000].iter().enumerate() {
            assert_eq!(*kind, log(&i.to_string()));
        }
        assert_eq!(seen[20_000], EventKind::Complete { code: Some(0) });
    }

    #[tokio::test]
    async fn test_stop_lets_child_exit_cleanly() {
        let script = "trap 'echo graceful-exit; exit 7' TERM; echo ready; sleep 30 >/dev/null 2>&1 & wait";
        let sup = Supervisor::builder(sh(script)).build();
        let mut sub = sup.subscribe();
        next(&mut sub).await;

        sup.start(request()).await.unwrap();
        assert_eq!(next(&mut sub).await, log("ready"));

        let asked = Instant::now();
        sup.stop().await.unwrap();

        assert_eq!(
            until_complete(&mut sub).await,
            vec![log("graceful-exit"), EventKind::Complete { code: Some(7) }]
        );
        assert!(asked.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_child_ignoring_sigterm_is_killed_after_grace() {
        let mut cfg = sh("trap '' TERM; echo ready; while :; do sleep 1; done");
        cfg.grace = Duration::from_millis(300);
        let sup = Supervisor::builder(cfg).build();
        let mut sub = sup.subscribe();
        next(&mut sub).await;

        sup.start(request()).await.unwrap();
        assert_eq!(next(&mut sub).await, log("ready"));
        sup.stop().await.unwrap();

        // the orphaned `sleep 1` may hold stdout until it ends
        assert_eq!(
            until_complete(&mut sub).await,
            vec![EventKind::Complete { code: None }]
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_running_child() {
        let sup = Supervisor::builder(sh("exec sleep 30")).build();
        let mut sub = sup.subscribe();
        next(&mut sub).await;

        sup.start(request()).await.unwrap();
        sup.shutdown().await;

        assert!(!sup.is_running().await);
        assert_eq!(
            until_complete(&mut sub).await,
            vec![EventKind::Complete { code: None }]
        );

        // idle shutdown is a no-op
        sup.shutdown().await;
    }
}
