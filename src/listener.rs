// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Local socket listener receiving captured flows from the capture process.
//!
//! Each connection carries one payload of newline-delimited JSON frames and is
//! read to end-of-stream. Decoded exchanges are handed to the owning context
//! through an unbounded channel so the listener never waits on its consumer.

use crate::error::{IngestError, ListenerError};
use crate::exchange::Exchange;
use crate::frame::decode_payload;
use crate::store::ExchangeStore;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/anvesha_proxy.sock";

const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Notification produced by the listener, in production order.
#[derive(Debug)]
pub enum IngestEvent {
    Exchange(Exchange),
    DecodeFailed(IngestError),
}

struct Running {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Ingestion service bound to one socket path.
///
/// Lifecycle is `Stopped -> Running -> Stopped`. Starting a running listener
/// and stopping a stopped one are both no-ops.
pub struct FlowListener {
    path: PathBuf,
    running: Option<Running>,
}

impl FlowListener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Remove any stale socket, bind, and spawn the accept loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, events: UnboundedSender<IngestEvent>) -> Result<(), ListenerError> {
        if self.running.is_some() {
            return Ok(());
        }

        remove_socket(&self.path).map_err(|source| ListenerError::Cleanup {
            path: self.path.clone(),
            source,
        })?;
        let listener = UnixListener::bind(&self.path).map_err(|source| ListenerError::Bind {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "flow listener started");

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(accept_loop(listener, shutdown_rx, events));
        self.running = Some(Running { shutdown, handle });
        Ok(())
    }

    /// Stop accepting and remove the socket file.
    ///
    /// Connections already being read are left to finish on their own.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(());
        if let Err(e) = running.handle.await {
            error!(error = %e, "flow listener task failed");
        }
        if let Err(e) = remove_socket(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove socket");
        }
        info!(path = %self.path.display(), "flow listener stopped");
    }
}

impl Drop for FlowListener {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(());
            let _ = remove_socket(&self.path);
        }
    }
}

fn remove_socket(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn accept_loop(
    listener: UnixListener,
    mut shutdown: oneshot::Receiver<()>,
    events: UnboundedSender<IngestEvent>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            res = listener.accept() => match res {
                Ok((stream, _)) => {
                    let events = events.clone();
                    tokio::spawn(handle_connection(stream, events));
                }
                Err(e) => {
                    error!(error = %e, "flow listener accept error");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
    }
    debug!("flow listener accept loop finished");
}

async fn handle_connection(mut stream: UnixStream, events: UnboundedSender<IngestEvent>) {
    let mut buf = Vec::new();
    if let Err(e) = stream.read_to_end(&mut buf).await {
        error!(error = %e, "failed to read flow payload");
        return;
    }
    if buf.is_empty() {
        return;
    }
    let count = ingest_payload(buf, &events);
    debug!(count, "flow payload ingested");
}

/// Decode one payload and emit an event per exchange and per bad segment,
/// in segment order.
/// Returns the number of exchanges emitted.
pub fn ingest_payload(payload: Vec<u8>, events: &UnboundedSender<IngestEvent>) -> usize {
    let text = match String::from_utf8(payload) {
        Ok(t) => t,
        Err(e) => {
            let err = IngestError::from(e);
            warn!(error = %err, "discarding flow payload");
            notify(events, IngestEvent::DecodeFailed(err));
            return 0;
        }
    };

    let mut count = 0;
    for segment in decode_payload(&text) {
        match segment {
            Ok(frame) => {
                notify(events, IngestEvent::Exchange(frame.into_exchange(Utc::now())));
                count += 1;
            }
            Err(failure) => {
                warn!(error = %failure, "failed to decode flow segment, skipping");
                notify(events, IngestEvent::DecodeFailed(failure));
            }
        }
    }
    count
}

fn notify(events: &UnboundedSender<IngestEvent>, event: IngestEvent) {
    if events.send(event).is_err() {
        debug!("ingestion consumer gone, dropping event");
    }
}

/// Counts from one drain of the ingestion channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    pub appended: usize,
    pub failed: usize,
}

/// Move every pending event into the store without waiting for more.
pub fn drain_events(
    events: &mut UnboundedReceiver<IngestEvent>,
    store: &mut ExchangeStore,
) -> DrainSummary {
    let mut summary = DrainSummary::default();
    while let Ok(event) = events.try_recv() {
        match event {
            IngestEvent::Exchange(ex) => {
                store.append(ex);
                summary.appended += 1;
            }
            IngestEvent::DecodeFailed(_) => summary.failed += 1,
        }
    }
    summary
}
