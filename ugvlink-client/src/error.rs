use ugvlink_protocol::{ProtocolError, TransportError};

/// Errors that can occur while driving the vehicle.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The serial device could not be opened (missing, permission denied,
    /// already in use).
    #[error("failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// No port was configured and none could be detected.
    #[error("no serial port detected (looked for /dev/ttyUSB*)")]
    NoSerialPort,

    /// The peer never acknowledged READY.
    #[error("peer 0x{peer_id:02X} did not acknowledge READY after {attempts} attempts")]
    HandshakeExhausted {
        /// The slave that was being contacted.
        peer_id: u8,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// No valid response arrived for this exchange (sync timeout, framing
    /// error, malformed length, or a frame addressed to another device).
    #[error("no valid response from peer")]
    NoResponse,

    /// The byte channel itself failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A message could not be built.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Method called in the wrong session state (e.g. `move_wheels` before
    /// `handshake`).
    #[error("invalid state: expected {expected}, actual {actual}")]
    InvalidState {
        /// The state required for the operation.
        expected: &'static str,
        /// The current session state.
        actual: &'static str,
    },
}

impl ClientError {
    /// Returns `true` for conditions the owning process cannot recover
    /// from: the link never came up or the peer is unreachable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Open { .. } | Self::NoSerialPort | Self::HandshakeExhausted { .. }
        )
    }
}

/// Convenience alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;
