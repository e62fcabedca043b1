//! # LogWriter: mirrors child output into the gateway log
//!
//! Listens on the output [`Bus`](crate::events::Bus) and re-emits every event
//! through `tracing` under the `simvisor::child` target.
//!
//! ## Example output
//! ```text
//! INFO simvisor::child: [log] Drone 1 assigned to task 2
//! WARN simvisor::child: [error] Warning: Invalid drone config at line 1
//! INFO simvisor::child: [complete] code=Some(0)
//! ```

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{Event, EventKind};

/// Event writer for the gateway's own log.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Spawns the listener; it exits when the bus is dropped.
    pub fn spawn_listener(self, mut rx: mpsc::UnboundedReceiver<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                self.write(&ev);
            }
        })
    }

    fn write(&self, e: &Event) {
        match &e.kind {
            EventKind::Log { data } => {
                tracing::info!(target: "simvisor::child", "[log] {data}");
            }
            EventKind::Error { data } => {
                tracing::warn!(target: "simvisor::child", "[error] {data}");
            }
            EventKind::Complete { code } => {
                tracing::info!(target: "simvisor::child", "[complete] code={code:?}");
            }
            EventKind::Connected => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    // current-thread runtime: the spawned listener runs on this thread and
    // sees the scoped subscriber.
    #[tokio::test]
    async fn test_child_output_is_mirrored_with_levels() {
        let out = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(out.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let bus = Bus::new();
        let listener = LogWriter::new().spawn_listener(bus.subscribe());

        bus.publish(Event::log("Drone 1 ready"));
        bus.publish(Event::error("Malformed DRONE line"));
        bus.publish(Event::complete(Some(0)));
        drop(bus);
        listener.await.unwrap();

        let text = out.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3, "{text}");
        assert!(lines[0].contains("INFO simvisor::child: [log] Drone 1 ready"), "{text}");
        assert!(lines[1].contains("WARN simvisor::child: [error] Malformed DRONE line"), "{text}");
        assert!(lines[2].contains("[complete] code=Some(0)"), "{text}");
    }

    #[tokio::test]
    async fn test_listener_ends_with_the_bus() {
        let bus = Bus::new();
        let listener = LogWriter::new().spawn_listener(bus.subscribe());
        bus.publish(Event::connected());
        drop(bus);

        tokio::time::timeout(std::time::Duration::from_secs(1), listener)
            .await
            .expect("listener still running")
            .unwrap();
    }
}
