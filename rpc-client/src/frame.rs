//! IPC frame codec
//!
//! Every message on the socket is a little-endian `u32` opcode, a
//! little-endian `u32` payload length, then the JSON payload itself.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, RpcError};

/// Largest payload accepted from the peer
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Frame opcodes understood by the voice client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Handshake,
    Frame,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub fn as_u32(self) -> u32 {
        match self {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Close => 2,
            Opcode::Ping => 3,
            Opcode::Pong => 4,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Opcode::Handshake),
            1 => Some(Opcode::Frame),
            2 => Some(Opcode::Close),
            3 => Some(Opcode::Ping),
            4 => Some(Opcode::Pong),
            _ => None,
        }
    }
}

/// A single decoded IPC frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: Value,
}

impl Frame {
    pub fn new(opcode: Opcode, payload: Value) -> Self {
        Self { opcode, payload }
    }

    /// Serialize the frame into its wire representation
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(&self.payload)?;
        if body.len() > MAX_FRAME_LEN {
            return Err(RpcError::Protocol(format!(
                "outgoing frame of {} bytes exceeds limit",
                body.len()
            )));
        }

        let mut buf = Vec::with_capacity(8 + body.len());
        buf.extend_from_slice(&self.opcode.as_u32().to_le_bytes());
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&body);
        Ok(buf)
    }
}

/// Read one frame, returning `Ok(None)` on a clean end of stream
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 8];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let raw_opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

    let opcode = Opcode::from_u32(raw_opcode)
        .ok_or_else(|| RpcError::Protocol(format!("unknown opcode {}", raw_opcode)))?;

    if len > MAX_FRAME_LEN {
        return Err(RpcError::Protocol(format!(
            "incoming frame of {} bytes exceeds limit",
            len
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;

    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };

    Ok(Some(Frame { opcode, payload }))
}

/// Write one frame and flush it
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.encode()?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
