//! Per-connection driver.
//!
//! Every accepted stream is split in two: a writer task that drains the
//! client's outbound queue onto the socket, and a reader loop that decodes one
//! frame at a time and hands it to the broker. The connection moves through
//! `Accepted -> Established -> Closing -> Closed` and never goes back.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::broker::{SharedBroker, lock};
use crate::client::{Client, ClientId};
use crate::protocol::{CloseReason, Inbound, read_frame, write_frame};

/// Why a connection is being torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseCause {
    Peer(CloseReason),
    Protocol(String),
    Io(String),
    /// The broker dropped the client (stalled queue or failed write).
    Evicted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    Established,
    Closing(CloseCause),
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("connection cannot {event} while {from:?}")]
pub struct InvalidTransition {
    pub from: ConnectionState,
    pub event: &'static str,
}

impl ConnectionState {
    pub fn establish(&mut self) -> Result<(), InvalidTransition> {
        self.transition("establish", |s| {
            matches!(s, ConnectionState::Accepted).then_some(ConnectionState::Established)
        })
    }

    pub fn close(&mut self, cause: CloseCause) -> Result<(), InvalidTransition> {
        self.transition("close", |s| match s {
            ConnectionState::Accepted | ConnectionState::Established => {
                Some(ConnectionState::Closing(cause))
            }
            ConnectionState::Closing(_) | ConnectionState::Closed => None,
        })
    }

    pub fn finish(&mut self) -> Result<(), InvalidTransition> {
        self.transition("finish", |s| {
            matches!(s, ConnectionState::Closing(_)).then_some(ConnectionState::Closed)
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Accepted | ConnectionState::Established)
    }

    fn transition(
        &mut self,
        event: &'static str,
        next: impl FnOnce(&ConnectionState) -> Option<ConnectionState>,
    ) -> Result<(), InvalidTransition> {
        match next(self) {
            Some(state) => {
                *self = state;
                Ok(())
            }
            None => Err(InvalidTransition {
                from: self.clone(),
                event,
            }),
        }
    }
}

/// How long a peer that closed on its own gets to drain frames already queued
/// for it before its writer is aborted.
pub const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn step(id: ClientId, result: Result<(), InvalidTransition>) {
    if let Err(e) = result {
        warn!("{id}: {e}");
    }
}

/// Drive one connection to completion. Returns the cause it was closed with.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    broker: SharedBroker,
    queue_capacity: usize,
) -> CloseCause
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (tx, rx) = mpsc::channel::<Vec<u8>>(queue_capacity);
    let shutdown = Arc::new(Notify::new());

    let client = Client::new(tx, shutdown.clone());
    let id = client.id;
    let mut state = ConnectionState::Accepted;

    lock(&broker).register_client(client);
    step(id, state.establish());
    info!("{id} connected from {peer}");

    let writer = tokio::spawn(write_loop(write_half, rx, id, shutdown.clone()));

    let cause = read_loop(BufReader::new(read_half), &broker, id, &shutdown).await;
    match &cause {
        CloseCause::Peer(reason) => debug!("{id} closed by peer ({reason:?})"),
        CloseCause::Protocol(e) => warn!("{id} sent a bad frame: {e}"),
        CloseCause::Io(e) => warn!("{id} i/o error: {e}"),
        CloseCause::Evicted => debug!("{id} evicted by the broker"),
    }
    step(id, state.close(cause.clone()));

    lock(&broker).cleanup_client(&id);
    release_writer(writer, &cause, id).await;
    step(id, state.finish());
    info!("{id} disconnected");

    cause
}

/// Wait for the writer to finish, or abort it.
///
/// The broker has already dropped the client's sender, so a writer that is
/// not stuck on the socket exits by itself. One blocked on a peer that stopped
/// reading never would, and the stream stays open until both halves are gone.
async fn release_writer(mut writer: JoinHandle<()>, cause: &CloseCause, id: ClientId) {
    let drain = match cause {
        CloseCause::Peer(_) | CloseCause::Protocol(_) => WRITER_DRAIN_TIMEOUT,
        CloseCause::Io(_) | CloseCause::Evicted => Duration::ZERO,
    };
    if timeout(drain, &mut writer).await.is_err() {
        debug!("{id}: writer still blocked, aborting it");
        writer.abort();
        // resolves once the task, and the write half it owns, is dropped
        let _ = writer.await;
    }
}

async fn read_loop<R>(
    mut reader: R,
    broker: &SharedBroker,
    id: ClientId,
    shutdown: &Notify,
) -> CloseCause
where
    R: AsyncRead + Unpin,
{
    loop {
        let inbound = tokio::select! {
            _ = shutdown.notified() => return CloseCause::Evicted,
            inbound = read_frame(&mut reader) => inbound,
        };

        match inbound {
            Ok(Inbound::Message {
                serializer,
                message,
            }) => {
                let handled = lock(broker).handle(id, serializer, message);
                if let Err(e) = handled {
                    return CloseCause::Protocol(e.to_string());
                }
            }
            Ok(Inbound::Closed(reason)) => return CloseCause::Peer(reason),
            Err(e) if e.is_protocol() => return CloseCause::Protocol(e.to_string()),
            Err(e) => return CloseCause::Io(e.to_string()),
        }
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<Vec<u8>>,
    id: ClientId,
    shutdown: Arc<Notify>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            warn!("failed to write to {id}: {e}");
            shutdown.notify_one();
            return;
        }
    }

    // queue closed: the broker has forgotten this client
    let _ = writer.shutdown().await;
    debug!("send loop closed for {id}");
}
