//! # Cortex Frame Decoder
//!
//! Reads frames from an async byte stream.
//!
//! Resynchronization is done by discarding bytes one at a time until the
//! start marker appears. The two header bytes after the marker are taken
//! unconditionally, so a stray `0xFA` inside a payload can cause one bad
//! frame; the sequence check downstream reports it.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::frame::*;
use crate::error::{CortexError, Result};

/// Scan for the start marker and read the rest of the header
///
/// # Errors
///
/// Returns `LinkIo` if the stream fails or closes before a full header
/// has been read.
pub async fn decode_header<R>(reader: &mut R) -> Result<Header>
where
    R: AsyncRead + Unpin,
{
    let mut discarded: usize = 0;
    while reader.read_u8().await.map_err(CortexError::LinkIo)? != START_MARKER {
        discarded += 1;
    }

    if discarded > 0 {
        debug!("Discarded {} bytes before start marker", discarded);
    }

    let mut rest = [0u8; HEADER_LEN - 1];
    reader
        .read_exact(&mut rest)
        .await
        .map_err(CortexError::LinkIo)?;

    Ok(Header {
        message_type: rest[0],
        sequence: rest[1],
    })
}

/// Read exactly `length_for(message_type)` payload bytes
///
/// # Errors
///
/// Returns `LinkIo` on a short read.
pub async fn decode_payload<R>(reader: &mut R, message_type: u8) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut payload = vec![0u8; length_for(message_type)];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(CortexError::LinkIo)?;
    Ok(payload)
}

/// Read one complete frame (header and payload)
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let header = decode_header(reader).await?;
    let payload = decode_payload(reader, header.message_type).await?;

    debug!(
        "Received frame type={} seq={} ({} payload bytes)",
        header.message_type,
        header.sequence,
        payload.len()
    );

    Ok(Frame { header, payload })
}

/// Decode the encoder counters of a status payload
///
/// Returns `None` if the payload is shorter than a status payload.
pub fn decode_status(payload: &[u8]) -> Option<StatusPayload> {
    if payload.len() < STATUS_PAYLOAD_LEN {
        return None;
    }

    Some(StatusPayload {
        left_count: read_i32_le(payload, STATUS_LEFT_OFFSET)?,
        right_count: read_i32_le(payload, STATUS_RIGHT_OFFSET)?,
    })
}
