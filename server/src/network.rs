//! Acceptor loop, matchmaking hand-off and session reaping

use crate::config::ServerConfig;
use crate::connection::{handle_connection, spawn_writer, PendingConnection, QueuedReader};
use crate::game::{run_tick_driver, Participant, Session, SessionSummary};
use crate::matchmaker::Registry;
use log::{debug, error, info, warn};
use shared::{Packet, PLAYERS_PER_SESSION};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};

/// Pause after a failed `accept`, e.g. when out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Messages sent from sessions and handles to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    SessionEnded { session_id: u64 },
    PendingClosed { connection_id: u64 },
    Shutdown,
}

/// Accepts players, pairs them into sessions and reclaims finished sessions
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    registry: Arc<Mutex<Registry>>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

/// Cloneable view into a running server for diagnostics and shutdown
#[derive(Clone)]
pub struct ServerHandle {
    registry: Arc<Mutex<Registry>>,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    /// Summaries of every registered session, ordered by id
    pub async fn active_sessions(&self) -> Vec<SessionSummary> {
        // Collect first so the registry lock is never held across a session lock
        let sessions = self.registry.lock().await.sessions();

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            summaries.push(session.summary().await);
        }
        summaries
    }

    pub async fn pending_count(&self) -> usize {
        self.registry.lock().await.pending_count()
    }

    /// Asks the server loop to stop accepting connections.
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

impl Server {
    /// Validates `config` and binds the listening socket.
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).await?;
        info!(
            "Server listening on {} at {} Hz",
            listener.local_addr()?,
            config.tick_rate
        );

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            config,
            registry: Arc::new(Mutex::new(Registry::new())),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            registry: Arc::clone(&self.registry),
            server_tx: self.server_tx.clone(),
        }
    }

    /// Main server loop: accepts connections and handles session teardown
    /// until shut down. Accept failures are logged and never end the loop.
    pub async fn run(mut self) -> io::Result<()> {
        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.admit(stream, peer).await,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                },

                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::SessionEnded { session_id }) => {
                            self.registry.lock().await.remove(session_id);
                        },
                        Some(ServerMessage::PendingClosed { connection_id }) => {
                            // Already claimed if it was paired in the meantime
                            self.registry.lock().await.remove_pending(connection_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },
            }
        }

        Ok(())
    }

    /// Queues a freshly accepted connection and starts a session when it
    /// completes a pair.
    async fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not disable Nagle for {}: {}", peer, e);
        }

        let (reader, writer) = stream.into_split();
        let outbound = spawn_writer(writer, peer);

        let mut pair = {
            let mut registry = self.registry.lock().await;
            let id = registry.allocate_connection_id();
            info!("Connection {} accepted from {}", id, peer);

            // Sent under the registry lock: a peer that sees Waiting is already queued
            if outbound.try_send(Packet::Waiting).is_err() {
                warn!("Could not queue waiting notice for {}", peer);
            }

            registry.enqueue(PendingConnection {
                id,
                peer,
                reader: QueuedReader::watch(id, reader, peer, self.server_tx.clone()),
                outbound,
            })
        };

        while let Some(candidates) = pair {
            pair = self.start_session(candidates).await;
        }
    }

    /// Creates a session for two paired connections and launches its tasks.
    ///
    /// A connection that closed while queued is dropped and its partner goes
    /// back to the head of the queue. Returns any pair formed by that requeue.
    async fn start_session(
        &self,
        pair: [PendingConnection; PLAYERS_PER_SESSION],
    ) -> Option<[PendingConnection; PLAYERS_PER_SESSION]> {
        let [first, second] = pair;
        let (first_reader, second_reader) =
            tokio::join!(first.reader.claim(), second.reader.claim());

        let (first_reader, second_reader) = match (first_reader, second_reader) {
            (Some(first_reader), Some(second_reader)) => (first_reader, second_reader),
            (first_reader, second_reader) => {
                let mut registry = self.registry.lock().await;
                let mut pair = None;

                // Later arrival first, so the earlier one ends up at the head
                for (id, peer, outbound, reader) in [
                    (second.id, second.peer, second.outbound, second_reader),
                    (first.id, first.peer, first.outbound, first_reader),
                ] {
                    match reader {
                        Some(reader) => {
                            info!("Connection {} lost its partner, back in the queue", id);
                            let reader =
                                QueuedReader::watch(id, reader, peer, self.server_tx.clone());
                            pair = registry.requeue(PendingConnection {
                                id,
                                peer,
                                reader,
                                outbound,
                            });
                        }
                        None => debug!("Connection {} ({}) left before pairing", id, peer),
                    }
                }
                return pair;
            }
        };

        let game = self.config.game;

        let session = {
            let mut registry = self.registry.lock().await;
            let session_id = registry.allocate_session_id();

            let participants = [
                Participant {
                    peer: first.peer,
                    outbound: first.outbound.clone(),
                },
                Participant {
                    peer: second.peer,
                    outbound: second.outbound.clone(),
                },
            ];

            let session = Arc::new(Session::new(
                session_id,
                game,
                participants,
                self.server_tx.clone(),
            ));
            registry.register(Arc::clone(&session));
            session
        };

        info!(
            "Session {} started: connection {} ({}) vs connection {} ({})",
            session.id(),
            first.id,
            first.peer,
            second.id,
            second.peer
        );

        let players = [
            (first.peer, first.outbound, first_reader),
            (second.peer, second.outbound, second_reader),
        ];
        for (slot, (peer, outbound, reader)) in players.into_iter().enumerate() {
            let welcome = Packet::Welcome {
                session_id: session.id(),
                slot,
                config: game,
            };
            if outbound.try_send(welcome).is_err() {
                warn!("Could not queue welcome for {}", peer);
            }

            tokio::spawn(handle_connection(
                Arc::clone(&session),
                slot,
                reader,
                peer,
                outbound,
            ));
        }

        tokio::spawn(run_tick_driver(session, self.config.tick_duration()));
        None
    }
}
