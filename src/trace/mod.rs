//! Connection tracing
//!
//! When enabled, the HTTP fetcher reports every new connection it opens as a
//! [`ConnEvent`]. A [`ConnTracer`] task owns the per-host tally; the
//! coordinator starts it at the beginning of a run and finishes it at the end,
//! getting back a [`ConnTrace`] snapshot.

use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A new network connection to `host`, resolved to `addr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnEvent {
    pub host: String,
    pub addr: String,
}

impl ConnEvent {
    /// Key the event is tallied under: `host <addr>`
    pub fn label(&self) -> String {
        format!("{} <{}>", self.host, self.addr)
    }
}

/// Sending half handed to the fetcher
///
/// Recording never blocks; events sent after the tracer finished are dropped.
#[derive(Debug, Clone)]
pub struct TraceSink {
    events: mpsc::UnboundedSender<ConnEvent>,
}

impl TraceSink {
    pub fn record(&self, event: ConnEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Connection tracer already finished, dropping event");
        }
    }
}

/// Number of connections opened, keyed by `host <addr>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnTrace {
    by_host: BTreeMap<String, usize>,
}

impl ConnTrace {
    pub fn record(&mut self, event: &ConnEvent) {
        *self.by_host.entry(event.label()).or_default() += 1;
    }

    /// Connections counted for a `host <addr>` label
    pub fn connections(&self, label: &str) -> usize {
        self.by_host.get(label).copied().unwrap_or(0)
    }

    /// Connections counted across all hosts
    pub fn total(&self) -> usize {
        self.by_host.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty()
    }

    /// Iterates `(label, connections)` in label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.by_host.iter().map(|(label, n)| (label.as_str(), *n))
    }
}

/// Collector task owning the connection tally
pub struct ConnTracer {
    sink: TraceSink,
    cancel: CancellationToken,
    handle: JoinHandle<ConnTrace>,
}

impl ConnTracer {
    /// Spawns the collector task; must be called inside a Tokio runtime
    pub fn start() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(collect(rx, cancel.clone()));

        Self {
            sink: TraceSink { events: tx },
            cancel,
            handle,
        }
    }

    pub fn sink(&self) -> TraceSink {
        self.sink.clone()
    }

    /// Stops the collector after draining queued events and returns the tally
    pub async fn finish(self) -> ConnTrace {
        self.cancel.cancel();
        match self.handle.await {
            Ok(trace) => trace,
            Err(e) => {
                tracing::warn!("Connection tracer failed: {}", e);
                ConnTrace::default()
            }
        }
    }
}

async fn collect(
    mut events: mpsc::UnboundedReceiver<ConnEvent>,
    cancel: CancellationToken,
) -> ConnTrace {
    let mut trace = ConnTrace::default();
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => trace.record(&event),
                None => break,
            },
            _ = cancel.cancelled() => {
                while let Ok(event) = events.try_recv() {
                    trace.record(&event);
                }
                break;
            }
        }
    }
    trace
}
