//! Types and rules shared by the session server and its clients
//!
//! - [`config`]: field geometry and ball speeds
//! - [`protocol`]: the versioned packet schema exchanged on the wire
//! - [`framing`]: length-prefixed frames over any async byte stream
//! - [`physics`]: the deterministic ball/paddle simulation

pub mod config;
pub mod framing;
pub mod physics;
pub mod protocol;

pub use config::{ConfigError, GameConfig};
pub use framing::{read_packet, receive_frame, send_frame, write_packet, FrameError};
pub use physics::{advance, move_paddle, Ball, GameState, PhysicsEvent};
pub use protocol::{BallPosition, Direction, Packet, Snapshot, PROTOCOL_VERSION};

/// Number of players in every session
pub const PLAYERS_PER_SESSION: usize = 2;
