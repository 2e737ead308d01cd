use crate::codes::{ResponseCode, TelemetryKind};
use crate::frame::Frame;

/// A slave→master message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Ack,
    Telemetry {
        kind: TelemetryKind,
        payload: Vec<u8>,
    },
    BatteryError,
    /// A function code outside the response table.
    Other {
        function_code: u8,
        payload: Vec<u8>,
    },
}

impl Response {
    /// Classify a decoded frame by its function code. Never fails: unknown
    /// codes become [`Response::Other`].
    pub fn from_frame(frame: Frame) -> Self {
        match ResponseCode::from_byte(frame.function_code) {
            Some(ResponseCode::Ack) => Self::Ack,
            Some(ResponseCode::BatteryError) => Self::BatteryError,
            Some(code) => match TelemetryKind::from_response_code(code) {
                Some(kind) => Self::Telemetry {
                    kind,
                    payload: frame.payload,
                },
                None => Self::Other {
                    function_code: frame.function_code,
                    payload: frame.payload,
                },
            },
            None => Self::Other {
                function_code: frame.function_code,
                payload: frame.payload,
            },
        }
    }

    /// Function code as carried on the wire.
    pub fn function_code(&self) -> u8 {
        match self {
            Self::Ack => ResponseCode::Ack.to_byte(),
            Self::Telemetry { kind, .. } => kind.response_code().to_byte(),
            Self::BatteryError => ResponseCode::BatteryError.to_byte(),
            Self::Other { function_code, .. } => *function_code,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Telemetry { payload, .. } | Self::Other { payload, .. } => payload,
            Self::Ack | Self::BatteryError => &[],
        }
    }

    /// Build the frame for `dest_id`, sent from `src_id`.
    pub fn to_frame(&self, dest_id: u8, src_id: u8) -> Frame {
        Frame::new(dest_id, src_id, self.function_code(), self.payload())
    }
}
