//! Length-delimited framing
//!
//! Every protocol field travels as one frame: a 4-byte big-endian payload
//! length followed by the payload bytes.

use crate::error::{ProtocolError, Result};

/// Frame header size
pub const HEADER_SIZE: usize = 4;

/// Maximum payload size of a single frame (16 MiB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encode the header for a payload of `len` bytes
pub fn encode_header(len: usize) -> Result<[u8; HEADER_SIZE]> {
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    // MAX_FRAME_SIZE fits in u32
    Ok((len as u32).to_be_bytes())
}

/// Decode a header into the announced payload length
///
/// Lengths above [`MAX_FRAME_SIZE`] are rejected before anything is
/// allocated for the payload.
pub fn decode_header(header: [u8; HEADER_SIZE]) -> Result<usize> {
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(len)
}

/// Split one complete frame off the front of `buf`
///
/// Returns `Ok(None)` when `buf` does not yet hold a whole frame, otherwise
/// the payload and the total number of bytes consumed.
pub fn decode(buf: &[u8]) -> Result<Option<(&[u8], usize)>> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&buf[..HEADER_SIZE]);
    let len = decode_header(header)?;

    let end = HEADER_SIZE + len;
    if buf.len() < end {
        return Ok(None);
    }
    Ok(Some((&buf[HEADER_SIZE..end], end)))
}
