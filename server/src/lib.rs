//! # Paddle Game Session Server
//!
//! Authoritative server for a two-player paddle game. It accepts TCP
//! connections, pairs them into independent sessions, simulates each session
//! at a fixed tick rate and streams the resulting state back to both players.
//!
//! ## Session Lifecycle
//!
//! Every connection moves through the same states:
//!
//! 1. **Accepted**: the socket is split, a writer task takes the write half
//!    and the peer is told it is waiting.
//! 2. **Pending**: the connection sits in the matchmaking queue while a
//!    watcher drops it if the peer leaves before being paired.
//! 3. **Paired**: the two oldest pending connections form a session; the
//!    earlier arrival plays in slot 0. Both receive a welcome with their slot
//!    and the field geometry.
//! 4. **Active**: a handler per player applies move commands while the
//!    session's tick driver advances the simulation and broadcasts snapshots.
//! 5. **Disconnected**: once both players are gone the session stops its
//!    driver and the server drops it from the registry.
//!
//! ## Concurrency
//!
//! Each session guards its paddles, ball, score and participant list with one
//! lock. Connection handlers hold it only long enough to move a paddle; the
//! tick driver holds it while advancing physics and queueing snapshots.
//! Snapshots are queued with `try_send` on bounded per-player queues, so a
//! slow client loses updates instead of stalling the game.
//!
//! The registry of pending connections and live sessions sits behind a
//! separate server-level lock and is never held while a session lock is
//! awaited.
//!
//! ## Module Organization
//!
//! - `config`: command line flags and [`config::ServerConfig`]
//! - `connection`: per-socket reader and writer tasks
//! - `game`: [`game::Session`] and its tick driver
//! - `matchmaker`: FIFO pairing and the session registry
//! - `network`: the acceptor loop and [`network::ServerHandle`]
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig {
//!         listen_addr: "127.0.0.1:8080".to_string(),
//!         ..ServerConfig::default()
//!     })
//!     .await?;
//!
//!     let handle = server.handle();
//!     tokio::spawn(server.run());
//!
//!     for session in handle.active_sessions().await {
//!         println!("session {} score {:?}", session.id, session.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod game;
pub mod matchmaker;
pub mod network;
