use ugvlink_protocol::{DecodeOptions, Setpoints};

/// Identity the master uses unless configured otherwise.
pub const DEFAULT_MASTER_ID: u8 = 0x01;
/// Radio modules ship configured for this speed.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;
pub const DEFAULT_HANDSHAKE_ATTEMPTS: u32 = 10;

/// Session state machine.
///
/// Transitions: `Disconnected` → `Handshaking` → `Ready`. A failed handshake
/// returns to `Disconnected`; failed requests leave `Ready` untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Link open, peer not yet confirmed.
    Disconnected,
    /// READY requests in flight.
    Handshaking,
    /// Peer acknowledged READY; commands may be sent.
    Ready,
}

impl SessionState {
    /// Returns the state name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Handshaking => "Handshaking",
            Self::Ready => "Ready",
        }
    }
}

/// Configuration for a [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Our own identity: `src_id` of outgoing frames, required `dest_id` of
    /// inbound ones. Default: `0x01`.
    pub master_id: u8,
    /// The slave being commanded: `dest_id` of outgoing frames.
    /// Default: `0x01`.
    pub peer_id: u8,
    /// Inbound frame timing and length byte order.
    pub decode: DecodeOptions,
    /// READY attempts before the handshake gives up. Default: 10.
    pub handshake_attempts: u32,
    /// Setpoints sent when the session shuts down. Default:
    /// [`Setpoints::NEUTRAL`].
    pub stop_setpoints: Setpoints,
}

impl SessionConfig {
    /// Default configuration commanding `peer_id`.
    pub fn for_peer(peer_id: u8) -> Self {
        Self {
            peer_id,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            master_id: DEFAULT_MASTER_ID,
            peer_id: 0x01,
            decode: DecodeOptions::default(),
            handshake_attempts: DEFAULT_HANDSHAKE_ATTEMPTS,
            stop_setpoints: Setpoints::NEUTRAL,
        }
    }
}

/// Where to find the radio module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    /// Serial device path. `None` picks the first `/dev/ttyUSB*`.
    pub port: Option<String>,
    /// Default: 57600.
    pub baud_rate: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}
