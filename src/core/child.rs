//! # One simulation child: spawn, feed, pump, wait.
//!
//! Helpers used by the [`Supervisor`](super::supervisor::Supervisor) for a
//! single run. None of them touch the process slot.
//!
//! ## Flow
//! ```text
//! spawn(cfg, req) ──► Child (stdin/stdout/stderr piped, kill_on_drop)
//!    ├─► feed(stdin, script)   write DRONE/TASK/START lines, then close stdin
//!    ├─► pump(stdout)          one Log event per line   ──► Bus
//!    ├─► pump(stderr)          one Error event per line ──► Bus
//!    └─► wait_or_stop(child)   exit status; once the run is cancelled SIGTERM,
//!           │                  then SIGKILL if still alive after grace
//!           └─► drain(pumps)   let both pumps reach EOF (bounded by grace)
//! ```
//!
//! ## Rules
//! - Lines are split on `\n`; trailing `\r\n` / `\n` is stripped; invalid UTF-8 is replaced.
//! - A stdin write failure (child exited early) is logged, never fatal.
//! - Pumps publish in read order, so one channel's events keep emission order.
//! - A cancelled child is asked to terminate first; it is only killed if it
//!   ignores SIGTERM for the whole grace period.

use std::process::Stdio;
use std::time::Duration;

use futures::future::join_all;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SupervisorError;
use crate::events::{Bus, Event};
use crate::simulation::{SimulationRequest, protocol};

use super::config::Config;

/// Which output channel of the child a pump reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Output {
    Stdout,
    Stderr,
}

impl Output {
    fn event(self, line: String) -> Event {
        match self {
            Output::Stdout => Event::log(line),
            Output::Stderr => Event::error(line),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Output::Stdout => "stdout",
            Output::Stderr => "stderr",
        }
    }
}

/// Launches the executable with all three standard streams piped.
pub(super) fn spawn(cfg: &Config, req: &SimulationRequest) -> Result<Child, SupervisorError> {
    let mut cmd = Command::new(&cfg.program);
    cmd.args(&cfg.program_args)
        .args(protocol::args(req))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd.spawn().map_err(|source| SupervisorError::Spawn {
        program: cfg.program.clone(),
        source,
    })
}

/// Writes the configuration script, then closes stdin.
pub(super) fn feed(mut stdin: ChildStdin, script: String, run: u64) {
    tokio::spawn(async move {
        if let Err(e) = stdin.write_all(script.as_bytes()).await {
            tracing::warn!(run, error = %e, "failed to write simulation config to stdin");
            return;
        }
        if let Err(e) = stdin.flush().await {
            tracing::warn!(run, error = %e, "failed to flush simulation config");
        }
        // dropping `stdin` closes the pipe
    });
}

/// Publishes one event per line read from `reader` until EOF.
pub(super) fn pump<R>(reader: R, output: Output, bus: Bus, run: u64) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => bus.publish(output.event(line_of(&buf))),
                Err(e) => {
                    tracing::debug!(run, channel = output.name(), error = %e, "output pump stopped");
                    break;
                }
            }
        }
    })
}

/// Waits for the child to exit; once `cancel` fires, terminates it and waits for that instead.
///
/// Returns the exit code, or `None` when the child was ended by a signal.
pub(super) async fn wait_or_stop(
    child: &mut Child,
    cancel: &CancellationToken,
    grace: Duration,
    run: u64,
) -> Option<i32> {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };

    let status = match exited {
        Some(status) => status,
        None => {
            terminate(child, run);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    tracing::warn!(run, ?grace, "simulation ignored SIGTERM; killing it");
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(run, error = %e, "failed to kill simulation");
                    }
                    child.wait().await
                }
            }
        }
    };

    match status {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!(run, error = %e, "failed to observe simulation exit");
            None
        }
    }
}

/// Sends SIGTERM to the child, if it has not been reaped yet.
#[cfg(unix)]
fn terminate(child: &Child, run: u64) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
        tracing::warn!(run, pid, error = %e, "failed to send SIGTERM to simulation");
    }
}

/// No polite termination outside unix; the child is killed.
#[cfg(not(unix))]
fn terminate(child: &mut Child, run: u64) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(run, error = %e, "failed to kill simulation");
    }
}

/// Waits up to `limit` for the pumps to reach EOF; aborts the ones still running.
pub(super) async fn drain(pumps: Vec<JoinHandle<()>>, limit: Duration, run: u64) {
    let aborts: Vec<_> = pumps.iter().map(JoinHandle::abort_handle).collect();
    if tokio::time::timeout(limit, join_all(pumps)).await.is_err() {
        tracing::warn!(run, ?limit, "simulation output still open after exit; abandoning it");
        for abort in aborts {
            abort.abort();
        }
    }
}

fn line_of(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_line_of_strips_terminators_and_replaces_invalid_utf8() {
        assert_eq!(line_of(b"Drone 1 ready\r\n"), "Drone 1 ready");
        assert_eq!(line_of(b"no newline"), "no newline");
        assert_eq!(line_of(b"\n"), "");
        assert_eq!(line_of(b"bad \xff byte\n"), "bad \u{fffd} byte");
    }

    #[tokio::test]
    async fn test_pump_publishes_each_line_in_order() {
        let bus = Bus::new();
        let mut rx = bus.subscribe();
        let input: &[u8] = b"first\nsecond\r\nlast";

        pump(input, Output::Stderr, bus.clone(), 1).await.unwrap();

        for expected in ["first", "second", "last"] {
            assert_eq!(
                rx.recv().await.unwrap().kind,
                EventKind::Error { data: expected.into() }
            );
        }
        assert!(rx.try_recv().is_err());
    }
}
