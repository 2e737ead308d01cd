use crate::codes::{RequestCode, TelemetryKind};
use crate::error::{ProtocolError, Result};
use crate::frame::Frame;

/// Which side of the vehicle a setpoint drives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Wheel {
    Right,
    Left,
}

impl std::fmt::Display for Wheel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Right => "right",
            Self::Left => "left",
        })
    }
}

/// Wheel speed setpoints, one unsigned byte per side.
///
/// The byte type makes an out-of-range setpoint unrepresentable; conversion
/// from wider or fractional values happens once, at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Setpoints {
    pub right: u8,
    pub left: u8,
}

impl Setpoints {
    /// Both sides at zero speed.
    pub const NEUTRAL: Self = Self::new(127, 127);

    /// Setpoints taken as-is; 127 is stopped on either side.
    pub const fn new(right: u8, left: u8) -> Self {
        Self { right, left }
    }

    /// Round fractional values to the nearest integer and reject anything
    /// outside `0..=255`.
    pub fn try_from_f64(right: f64, left: f64) -> Result<Self> {
        Ok(Self {
            right: checked_byte(Wheel::Right, right)?,
            left: checked_byte(Wheel::Left, left)?,
        })
    }

    /// Round, then clamp into `0..=255`. NaN maps to the neutral value.
    pub fn clamped(right: f64, left: f64) -> Self {
        Self {
            right: clamped_byte(right),
            left: clamped_byte(left),
        }
    }

    /// Wire payload: `[right, left]`.
    pub fn to_payload(self) -> [u8; 2] {
        [self.right, self.left]
    }

    /// Read a MOVE payload, which must be exactly `[right, left]`.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        match payload {
            [right, left] => Ok(Self::new(*right, *left)),
            _ => Err(ProtocolError::InvalidPayload {
                command: RequestCode::Move.as_str(),
                expected: 2,
                actual: payload.len(),
            }),
        }
    }
}

fn checked_byte(wheel: Wheel, value: f64) -> Result<u8> {
    let rounded = value.round();
    if !(0.0..=255.0).contains(&rounded) {
        return Err(ProtocolError::SetpointOutOfRange { wheel, value });
    }
    Ok(rounded as u8)
}

fn clamped_byte(value: f64) -> u8 {
    if value.is_nan() {
        return Setpoints::NEUTRAL.right;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// A master→slave message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Ready,
    Move(Setpoints),
    Telemetry(TelemetryKind),
}

impl Request {
    /// Function code this request is sent with.
    pub fn code(&self) -> RequestCode {
        match self {
            Self::Ready => RequestCode::Ready,
            Self::Move(_) => RequestCode::Move,
            Self::Telemetry(kind) => kind.request_code(),
        }
    }

    /// Payload bytes; empty for everything but MOVE.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::Move(setpoints) => setpoints.to_payload().to_vec(),
            Self::Ready | Self::Telemetry(_) => Vec::new(),
        }
    }

    /// Build the frame for `dest_id`, sent from `src_id`.
    pub fn to_frame(&self, dest_id: u8, src_id: u8) -> Frame {
        Frame::new(dest_id, src_id, self.code().to_byte(), self.payload())
    }

    /// Interpret a received frame as a request (slave side).
    pub fn parse(frame: &Frame) -> Result<Self> {
        let code = RequestCode::from_byte(frame.function_code)?;
        match code {
            RequestCode::Ready => Ok(Self::Ready),
            RequestCode::Move => Ok(Self::Move(Setpoints::from_payload(&frame.payload)?)),
            other => TelemetryKind::from_request_code(other)
                .map(Self::Telemetry)
                .ok_or(ProtocolError::UnknownRequestCode(frame.function_code)),
        }
    }
}
