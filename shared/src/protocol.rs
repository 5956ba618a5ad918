//! Wire protocol between players and the session server
//!
//! Every frame payload is a bincode-encoded [`Envelope`] carrying the protocol
//! version next to a tagged [`Packet`]. Decoding only ever produces plain data,
//! and frames from a peer speaking another protocol version are rejected.

use crate::config::GameConfig;
use crate::framing::FrameError;
use bincode::{deserialize, serialize};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u16 = 1;

/// Paddle movement requested by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Stationary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallPosition {
    pub x: f32,
    pub y: f32,
}

/// Point-in-time view of one session, indexed by player slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub paddles: [i32; 2],
    pub ball: BallPosition,
    pub score: [u32; 2],
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Client -> server
    Move {
        direction: Direction,
    },

    // Server -> client
    Welcome {
        session_id: u64,
        slot: usize,
        config: GameConfig,
    },
    /// Sent while the connection's session has fewer than two players
    Waiting,
    State(Snapshot),
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u16,
    packet: Packet,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u16,
    packet: &'a Packet,
}

/// Serializes a packet into a frame payload.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, FrameError> {
    Ok(serialize(&EnvelopeRef {
        version: PROTOCOL_VERSION,
        packet,
    })?)
}

/// Parses a frame payload, rejecting foreign protocol versions.
pub fn decode(payload: &[u8]) -> Result<Packet, FrameError> {
    let envelope: Envelope = deserialize(payload)?;
    if envelope.version != PROTOCOL_VERSION {
        return Err(FrameError::Protocol(format!(
            "unsupported protocol version {} (expected {})",
            envelope.version, PROTOCOL_VERSION
        )));
    }
    Ok(envelope.packet)
}
