//! # Headless Game Client
//!
//! A protocol-level client for the paddle game server. It connects over TCP,
//! waits to be paired, tracks the authoritative snapshots the server streams
//! and sends paddle moves. Rendering and keyboard capture are left to
//! front ends built on top of this crate.
//!
//! ## Module Organization
//!
//! - `network`: [`network::Client`], the framed connection to the server
//! - `game`: [`game::ClientGameState`], the latest known session state and a
//!   simple autopilot that keeps the paddle level with the ball
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::Direction;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("127.0.0.1:8080").await?;
//!     let assignment = client.wait_for_assignment().await?;
//!     println!("playing in slot {}", assignment.slot);
//!
//!     client.send_move(Direction::Up).await?;
//!     let snapshot = client.next_snapshot().await?;
//!     println!("paddles at {:?}", snapshot.paddles);
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
