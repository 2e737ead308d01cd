use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::{END_MARKER, Frame, START_MARKER};
use crate::error::{DecodeError, TransportError};
use crate::transport::Transport;

/// Byte order used to interpret the inbound length field.
///
/// Frames are always transmitted little-endian. Some slave firmware builds
/// answer with a big-endian length; `Big` reads those.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LengthOrder {
    #[default]
    Little,
    Big,
}

impl LengthOrder {
    fn read(self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(bytes),
            Self::Big => u16::from_be_bytes(bytes),
        }
    }
}

/// Timing and layout knobs for [`decode_incoming`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum wait for the start marker, measured from the first read
    /// attempt. Default: 100 ms.
    pub sync_timeout: Duration,
    /// Maximum wait for each byte after the start marker. Default: 500 ms.
    pub byte_timeout: Duration,
    /// Inbound length byte order. Default: little-endian.
    pub length_order: LengthOrder,
    /// Largest declared payload accepted; a longer one fails as a framing
    /// error before any payload byte is read. Default: 65535 (no limit).
    pub max_payload: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            sync_timeout: Duration::from_millis(100),
            byte_timeout: Duration::from_millis(500),
            length_order: LengthOrder::Little,
            max_payload: usize::from(u16::MAX),
        }
    }
}

/// Read exactly one frame from `transport`.
///
/// Leading noise is discarded until a start marker shows up. The frame is
/// accepted only if its end marker is intact and it is addressed to
/// `local_id`. Every byte is read individually; nothing is consumed past the
/// end marker.
pub fn decode_incoming<T: Transport + ?Sized>(
    transport: &mut T,
    local_id: u8,
    options: &DecodeOptions,
) -> Result<Frame, DecodeError> {
    let skipped = await_start(transport, options)?;
    if skipped > 0 {
        debug!(skipped, "discarded noise before start marker");
    }

    let byte_timeout = options.byte_timeout;
    let dest_id = read_in_frame(transport, byte_timeout)?;
    let src_id = read_in_frame(transport, byte_timeout)?;

    let mut len_bytes = [0u8; 2];
    for (got, slot) in len_bytes.iter_mut().enumerate() {
        *slot = match read_byte(transport, byte_timeout)? {
            Some(b) => b,
            None => {
                warn!(got, "length bytes are not valid");
                return Err(DecodeError::MalformedLength { got });
            }
        };
    }
    let length = options.length_order.read(len_bytes) as usize;
    trace!(length, "received data length");
    if length > options.max_payload {
        warn!(length, max = options.max_payload, "declared length over limit");
        return Err(DecodeError::FramingError { found: None });
    }

    let function_code = read_in_frame(transport, byte_timeout)?;
    let mut payload = Vec::new();
    for _ in 0..length {
        payload.push(read_in_frame(transport, byte_timeout)?);
    }

    let end = read_byte(transport, byte_timeout)?;
    let frame = Frame {
        dest_id,
        src_id,
        function_code,
        payload,
    };

    if end != Some(END_MARKER) {
        warn!(found = ?end, "end marker not found");
        return Err(DecodeError::FramingError { found: end });
    }
    if frame.dest_id != local_id {
        warn!(
            dest_id = frame.dest_id,
            local_id, "frame addressed to another device"
        );
        return Err(DecodeError::ForeignFrame {
            dest_id: frame.dest_id,
            local_id,
        });
    }

    trace!(
        src_id = frame.src_id,
        function_code = frame.function_code,
        length = frame.length(),
        "frame received"
    );
    Ok(frame)
}

/// Consume bytes up to and including the start marker. Returns the number
/// of bytes discarded on the way.
fn await_start<T: Transport + ?Sized>(
    transport: &mut T,
    options: &DecodeOptions,
) -> Result<usize, DecodeError> {
    let deadline = Instant::now() + options.sync_timeout;
    let mut skipped = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(skipped, "start marker not found");
            return Err(DecodeError::SyncTimeout(options.sync_timeout));
        }
        let wait = remaining.min(options.byte_timeout);

        match transport.read_byte(wait) {
            Ok(START_MARKER) => return Ok(skipped),
            Ok(b) => {
                trace!(byte = b, "skipping noise");
                skipped += 1;
            }
            // The whole remaining budget was spent waiting on this byte.
            Err(TransportError::Timeout) if wait == remaining => {
                debug!(skipped, "start marker not found");
                return Err(DecodeError::SyncTimeout(options.sync_timeout));
            }
            Err(TransportError::Timeout) => {}
            Err(e) => return Err(DecodeError::Transport(e)),
        }
    }
}

/// A timeout here means the link went quiet mid-frame, so the end marker
/// can no longer be observed.
fn read_in_frame<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
) -> Result<u8, DecodeError> {
    read_byte(transport, timeout)?.ok_or_else(|| {
        warn!("link went quiet mid-frame");
        DecodeError::FramingError { found: None }
    })
}

fn read_byte<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
) -> Result<Option<u8>, DecodeError> {
    match transport.read_byte(timeout) {
        Ok(b) => Ok(Some(b)),
        Err(TransportError::Timeout) => Ok(None),
        Err(e) => Err(DecodeError::Transport(e)),
    }
}
