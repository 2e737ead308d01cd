use std::time::Duration;

use crate::command::Wheel;

/// Errors raised while building or interpreting protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("payload too long: {actual} bytes exceeds the {max}-byte length field")]
    PayloadTooLong { max: usize, actual: usize },

    #[error("{wheel} setpoint out of range: {value} (expected 0..=255)")]
    SetpointOutOfRange { wheel: Wheel, value: f64 },

    #[error("unknown request function code: 0x{0:02X}")]
    UnknownRequestCode(u8),

    #[error("invalid payload for {command}: expected {expected} bytes, got {actual}")]
    InvalidPayload {
        command: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Failure of a single [`Transport`](crate::Transport) operation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No byte arrived within the per-byte timeout.
    #[error("read timed out")]
    Timeout,

    /// The other end of the link is gone.
    #[error("link closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an inbound frame could not be accepted.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No start marker arrived within the sync timeout.
    #[error("no start marker within {0:?}")]
    SyncTimeout(Duration),

    /// The transport could not supply both length bytes.
    #[error("length field truncated: got {got} of 2 bytes")]
    MalformedLength { got: usize },

    /// End sentinel missing or wrong. `found` is `None` when the link went
    /// quiet before the end of the frame or the declared length was over
    /// the configured limit.
    #[error("framing error: expected end marker 0x03, found {found:?}")]
    FramingError { found: Option<u8> },

    /// Well-formed frame addressed to another station.
    #[error("frame addressed to 0x{dest_id:02X}, local id is 0x{local_id:02X}")]
    ForeignFrame { dest_id: u8, local_id: u8 },

    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl DecodeError {
    /// Returns `true` for a well-formed frame meant for someone else.
    pub fn is_foreign(&self) -> bool {
        matches!(self, Self::ForeignFrame { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
