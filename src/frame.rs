//! Serial frame protocol of the 2JCIE-BU01 USB interface.
//!
//! Wire layout, little-endian multi-byte fields:
//!
//! ```text
//! magic(2) | length(u16) | mode(1) | address(u16) | payload | crc16(2)
//! ```
//!
//! `length` covers everything from `mode` through `crc16` inclusive; the
//! CRC covers everything before it. Frames are built and consumed within a
//! single request/response exchange and never persisted.

use crate::crc::crc16;
use thiserror::Error;

/// Frame magic, ASCII "RB".
pub const MAGIC: [u8; 2] = [0x52, 0x42];

/// Size of the fixed frame header (magic + length).
pub const HEADER_LEN: usize = 4;

const MODE_READ: u8 = 0x01;
const MODE_WRITE: u8 = 0x02;

/// Minimum body length: mode + address + CRC.
const MIN_BODY_LEN: usize = 5;

/// Frame-format errors on the inbound path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Header does not start with the fixed magic bytes.
    #[error("bad frame magic {0:02x?}")]
    BadMagic([u8; 2]),
    /// Received CRC does not match the computed one.
    #[error("frame CRC mismatch (computed {computed:#06x}, received {received:#06x})")]
    CrcMismatch { computed: u16, received: u16 },
    /// Body shorter than mode + address + CRC.
    #[error("frame body of {0} bytes is too short")]
    Truncated(usize),
}

/// Address and payload extracted from a validated response frame.
///
/// The address is repeated here so the layer above can select the schema;
/// framing itself is schema-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePayload {
    pub address: u16,
    pub payload: Vec<u8>,
}

/// Build an outbound command frame.
///
/// A non-empty `payload` makes this a write command, an empty one a read.
pub fn build_frame(address: u16, payload: &[u8]) -> Vec<u8> {
    let mode = if payload.is_empty() {
        MODE_READ
    } else {
        MODE_WRITE
    };
    let body_len = 1 + 2 + payload.len(); // mode + address + payload
    let length = (body_len + 2) as u16; // CRC included

    let mut frame = Vec::with_capacity(HEADER_LEN + body_len + 2);
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.push(mode);
    frame.extend_from_slice(&address.to_le_bytes());
    frame.extend_from_slice(payload);
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Validate a response header and return the body length to read next.
pub fn parse_header(header: &[u8; HEADER_LEN]) -> Result<u16, FrameError> {
    if header[..2] != MAGIC {
        return Err(FrameError::BadMagic([header[0], header[1]]));
    }
    Ok(u16::from_le_bytes([header[2], header[3]]))
}

/// Validate a response body against its header and strip the framing.
///
/// `body` is the `length` bytes following the header: mode, address,
/// payload and trailing CRC. The CRC is verified over header plus body,
/// then the mode byte and CRC are stripped.
pub fn parse_body(header: &[u8; HEADER_LEN], body: &[u8]) -> Result<ResponsePayload, FrameError> {
    if body.len() < MIN_BODY_LEN {
        return Err(FrameError::Truncated(body.len()));
    }

    let (covered, crc_bytes) = body.split_at(body.len() - 2);
    let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);

    let mut span = Vec::with_capacity(HEADER_LEN + covered.len());
    span.extend_from_slice(header);
    span.extend_from_slice(covered);
    let computed = crc16(&span);
    if computed != received {
        return Err(FrameError::CrcMismatch { computed, received });
    }

    // covered = mode | address | payload
    let address = u16::from_le_bytes([covered[1], covered[2]]);
    Ok(ResponsePayload {
        address,
        payload: covered[3..].to_vec(),
    })
}
