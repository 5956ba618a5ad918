//! Per-connection tasks
//!
//! Every accepted socket is split in two. The write half is owned by a writer
//! task fed through a bounded queue. While the connection is queued its read
//! half is watched for an early close; once paired, it is owned by exactly one
//! handler that decodes move commands and applies them to the player's session.

use crate::game::Session;
use crate::network::ServerMessage;
use log::{debug, info, warn};
use shared::{read_packet, write_packet, Packet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Frames buffered per player before updates are dropped
pub const OUTBOUND_QUEUE_LEN: usize = 32;

/// A connection waiting in the matchmaking queue
#[derive(Debug)]
pub struct PendingConnection {
    pub id: u64,
    pub peer: SocketAddr,
    pub reader: QueuedReader,
    pub outbound: mpsc::Sender<Packet>,
}

/// Read half of a queued connection, watched until it is claimed
#[derive(Debug)]
pub struct QueuedReader {
    claim: oneshot::Sender<()>,
    task: JoinHandle<Option<OwnedReadHalf>>,
}

impl QueuedReader {
    /// Watches `reader` for the peer closing before it is paired.
    ///
    /// A close or read error drops the reader and sends
    /// `ServerMessage::PendingClosed` for `id`. Bytes that arrive early are
    /// only peeked, so they stay buffered for the handler.
    pub fn watch(
        id: u64,
        mut reader: OwnedReadHalf,
        peer: SocketAddr,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        let (claim, mut claimed) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut probe = [0u8; 1];
            let peeked = tokio::select! {
                _ = &mut claimed => None,
                peeked = reader.peek(&mut probe) => Some(peeked),
            };

            let reason = match peeked {
                None => return Some(reader),
                Some(Ok(n)) if n > 0 => {
                    debug!("Connection {} sent data before pairing", id);
                    let _ = claimed.await;
                    return Some(reader);
                }
                Some(Ok(_)) => "closed the connection".to_string(),
                Some(Err(e)) => e.to_string(),
            };

            info!("Connection {} ({}) left the queue: {}", id, peer, reason);
            if server_tx
                .send(ServerMessage::PendingClosed { connection_id: id })
                .is_err()
            {
                debug!("Server stopped before connection {} left", id);
            }
            None
        });

        Self { claim, task }
    }

    /// Stops watching and hands back the reader, or `None` if the peer is gone.
    pub async fn claim(self) -> Option<OwnedReadHalf> {
        // Fails only when the watcher already finished
        let _ = self.claim.send(());

        match self.task.await {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Queue watcher failed: {}", e);
                None
            }
        }
    }
}

/// Spawns the writer task for `writer` and returns its queue.
///
/// The task ends, shutting the write half down, when every sender is dropped
/// or a write fails.
pub fn spawn_writer<W>(mut writer: W, peer: SocketAddr) -> mpsc::Sender<Packet>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Packet>(OUTBOUND_QUEUE_LEN);

    tokio::spawn(async move {
        while let Some(packet) = rx.recv().await {
            if let Err(e) = write_packet(&mut writer, &packet).await {
                warn!("Dropping connection to {}: {}", peer, e);
                break;
            }
        }

        if let Err(e) = writer.shutdown().await {
            debug!("Shutdown of {} failed: {}", peer, e);
        }
        debug!("Writer for {} finished", peer);
    });

    tx
}

/// Reads commands from one player until the connection ends, then removes
/// the player from its session.
///
/// `outbound` is the player's writer queue; the handler also stops once that
/// writer has failed.
pub async fn handle_connection<R>(
    session: Arc<Session>,
    slot: usize,
    mut reader: R,
    peer: SocketAddr,
    outbound: mpsc::Sender<Packet>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let read = tokio::select! {
            read = read_packet(&mut reader) => read,
            _ = outbound.closed() => {
                warn!("Writer to {} stopped, disconnecting", peer);
                break;
            }
        };

        match read {
            Ok(Some(Packet::Move { direction })) => {
                session.apply_move(slot, direction).await;
            }
            Ok(Some(other)) => {
                warn!("Ignoring unexpected packet from {}: {:?}", peer, other);
            }
            Ok(None) => {
                info!(
                    "Player {} of session {} closed the connection",
                    slot,
                    session.id()
                );
                break;
            }
            Err(e) if e.is_protocol() => {
                warn!("Protocol error from {}, disconnecting: {}", peer, e);
                break;
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", peer, e);
                break;
            }
        }
    }

    session.disconnect(slot).await;
}
