//! Connection to the game server

use crate::game::ClientGameState;
use log::{debug, info, warn};
use shared::{read_packet, write_packet, Direction, FrameError, GameConfig, Packet};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{interval, sleep_until, Instant};

/// Slot and field geometry assigned by the server at pairing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub session_id: u64,
    pub slot: usize,
    pub config: GameConfig,
}

pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    server_addr: SocketAddr,
}

impl Client {
    pub async fn connect(server_addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        let server_addr = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();

        info!("Connected to {}", server_addr);
        Ok(Client {
            reader,
            writer,
            server_addr,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub async fn send_move(&mut self, direction: Direction) -> Result<(), FrameError> {
        write_packet(&mut self.writer, &Packet::Move { direction }).await
    }

    /// Next packet from the server, `None` once the server closed the stream.
    pub async fn next_packet(&mut self) -> Result<Option<Packet>, FrameError> {
        read_packet(&mut self.reader).await
    }

    /// Skips waiting notices until the server pairs this client.
    pub async fn wait_for_assignment(&mut self) -> Result<Assignment, FrameError> {
        loop {
            match self.next_packet().await? {
                Some(Packet::Welcome {
                    session_id,
                    slot,
                    config,
                }) => {
                    return Ok(Assignment {
                        session_id,
                        slot,
                        config,
                    })
                }
                Some(Packet::Waiting) => debug!("Still waiting for an opponent"),
                Some(other) => warn!("Unexpected packet before pairing: {:?}", other),
                None => {
                    return Err(FrameError::Protocol(
                        "server closed the connection before pairing".to_string(),
                    ))
                }
            }
        }
    }

    /// Next snapshot, skipping any other packets.
    pub async fn next_snapshot(&mut self) -> Result<shared::Snapshot, FrameError> {
        loop {
            match self.next_packet().await? {
                Some(Packet::State(snapshot)) => return Ok(snapshot),
                Some(_) => continue,
                None => {
                    return Err(FrameError::Protocol(
                        "server closed the connection".to_string(),
                    ))
                }
            }
        }
    }

    /// Closes the connection, which the server treats as leaving the session.
    pub async fn close(mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }

    /// Plays until `duration` has passed (forever if `None`) or the server
    /// goes away. With `autopilot` the paddle chases the ball.
    pub async fn run(
        &mut self,
        state: &mut ClientGameState,
        autopilot: bool,
        duration: Option<Duration>,
    ) -> Result<(), FrameError> {
        let deadline = duration.map(|d| Instant::now() + d);
        let mut input_interval = interval(Duration::from_millis(16));
        let mut last_sent = Direction::Stationary;

        loop {
            // Kept alive across input ticks: dropping a read mid-frame would
            // desynchronise the stream.
            let read = read_packet(&mut self.reader);
            tokio::pin!(read);

            let packet = loop {
                tokio::select! {
                    packet = &mut read => break packet?,

                    _ = input_interval.tick(), if autopilot => {
                        let direction = state.autopilot_direction();
                        let moving = direction != Direction::Stationary;
                        if moving || last_sent != Direction::Stationary {
                            write_packet(&mut self.writer, &Packet::Move { direction }).await?;
                        }
                        last_sent = direction;
                    },

                    _ = wait_until(deadline) => {
                        info!("Finished after {} snapshots", state.snapshots_received);
                        return Ok(());
                    },
                }
            };

            match packet {
                Some(packet) => state.apply_packet(packet),
                None => {
                    info!("Server closed the connection");
                    return Ok(());
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
