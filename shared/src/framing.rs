//! Length-prefixed message framing over a byte stream
//!
//! A frame is a 4-byte big-endian payload length followed by the payload.
//! Readers keep reading until the declared length has arrived, so a payload
//! split across several TCP segments is reassembled transparently.

use crate::protocol::{decode, encode, Packet};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted in either direction
pub const MAX_FRAME_LEN: usize = 64 * 1024;

const LENGTH_PREFIX_LEN: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("malformed payload: {0}")]
    Codec(#[from] bincode::Error),
}

impl FrameError {
    /// True for faults caused by what the peer sent rather than by the socket.
    pub fn is_protocol(&self) -> bool {
        matches!(self, FrameError::Protocol(_) | FrameError::Codec(_))
    }
}

/// Writes one frame and flushes it.
pub async fn send_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.is_empty() || payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::Protocol(format!(
            "refusing to send frame of {} bytes",
            payload.len()
        )));
    }

    let len = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly between frames.
/// A stream that ends partway through a frame is a protocol error.
pub async fn receive_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    let mut filled = 0;

    while filled < LENGTH_PREFIX_LEN {
        let n = reader.read(&mut prefix[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(FrameError::Protocol(format!(
                "stream closed after {} of {} length bytes",
                filled, LENGTH_PREFIX_LEN
            )));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(FrameError::Protocol(format!(
            "declared frame length {} outside 1..={}",
            len, MAX_FRAME_LEN
        )));
    }

    let mut payload = vec![0u8; len];
    match reader.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(payload)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FrameError::Protocol(
            format!("stream closed inside a {} byte frame", len),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Encodes and sends a packet as one frame.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let payload = encode(packet)?;
    send_frame(writer, &payload).await
}

/// Receives and decodes one packet, `Ok(None)` on clean end of stream.
pub async fn read_packet<R>(reader: &mut R) -> Result<Option<Packet>, FrameError>
where
    R: AsyncRead + Unpin,
{
    match receive_frame(reader).await? {
        Some(payload) => decode(&payload).map(Some),
        None => Ok(None),
    }
}
