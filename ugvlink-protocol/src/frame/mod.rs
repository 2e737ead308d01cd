//! Frame layout and encoding.
//!
//! ```text
//! +-----+------+-----+--------+--------+------+-----------------+-----+
//! | STX | dest | src | len_lo | len_hi | code | payload[0..len] | ETX |
//! +-----+------+-----+--------+--------+------+-----------------+-----+
//! ```
//!
//! STX (0x02) and ETX (0x03) must never appear in the fixed header fields.
//! Payload bytes are unconstrained because their count is known in advance.

mod decode;

pub use decode::{DecodeOptions, LengthOrder, decode_incoming};

use crate::error::{ProtocolError, Result};

pub const START_MARKER: u8 = 0x02;
pub const END_MARKER: u8 = 0x03;
/// Bytes before the payload: STX, dest, src, 2 length bytes, function code.
pub const HEADER_LEN: usize = 6;
/// Frame size without payload.
pub const OVERHEAD: usize = HEADER_LEN + 1;
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// A decoded protocol message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub dest_id: u8,
    pub src_id: u8,
    pub function_code: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(dest_id: u8, src_id: u8, function_code: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            dest_id,
            src_id,
            function_code,
            payload: payload.into(),
        }
    }

    /// Value of the length field, i.e. the payload size.
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self.dest_id, self.src_id, self.function_code, &self.payload)
    }
}

/// Encode a frame. The length field is always little-endian on transmit.
pub fn encode(dest_id: u8, src_id: u8, function_code: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let len = u16::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLong {
        max: MAX_PAYLOAD_LEN,
        actual: payload.len(),
    })?;

    let mut frame = Vec::with_capacity(OVERHEAD + payload.len());
    frame.push(START_MARKER);
    frame.push(dest_id);
    frame.push(src_id);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.push(function_code);
    frame.extend_from_slice(payload);
    frame.push(END_MARKER);

    debug_assert_eq!(frame.len(), OVERHEAD + payload.len());
    Ok(frame)
}

/// Render bytes as `"0x02 0x01 ..."` for trace output.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
