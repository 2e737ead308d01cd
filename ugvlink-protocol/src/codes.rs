//! Function codes carried in the frame header.
//!
//! Master→slave and slave→master codes live in separate number spaces and
//! overlap (`0x04` is READY going out and REMAINING_CAPACITY coming back),
//! so they are modelled as two distinct enums.

use crate::error::{ProtocolError, Result};

/// Function codes sent by the master.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestCode {
    Ready,
    Move,
    GetStateOfCharge,
    GetVoltage,
    GetRemainingCapacity,
    GetTemperature,
    GetCurrent,
}

impl RequestCode {
    pub const ALL: [Self; 7] = [
        Self::Ready,
        Self::Move,
        Self::GetStateOfCharge,
        Self::GetVoltage,
        Self::GetRemainingCapacity,
        Self::GetTemperature,
        Self::GetCurrent,
    ];

    /// Parse from the wire byte.
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0x04 => Ok(Self::Ready),
            0x05 => Ok(Self::Move),
            0x06 => Ok(Self::GetStateOfCharge),
            0x07 => Ok(Self::GetVoltage),
            0x08 => Ok(Self::GetRemainingCapacity),
            0x09 => Ok(Self::GetTemperature),
            0x0A => Ok(Self::GetCurrent),
            _ => Err(ProtocolError::UnknownRequestCode(b)),
        }
    }

    /// Serialize to the wire byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Ready => 0x04,
            Self::Move => 0x05,
            Self::GetStateOfCharge => 0x06,
            Self::GetVoltage => 0x07,
            Self::GetRemainingCapacity => 0x08,
            Self::GetTemperature => 0x09,
            Self::GetCurrent => 0x0A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Move => "MOVE",
            Self::GetStateOfCharge => "GET_SOC",
            Self::GetVoltage => "GET_V",
            Self::GetRemainingCapacity => "GET_R_CAP",
            Self::GetTemperature => "GET_TEMP",
            Self::GetCurrent => "GET_CURR",
        }
    }
}

/// Function codes sent back by the slave.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Ack,
    StateOfCharge,
    Voltage,
    RemainingCapacity,
    Temperature,
    Current,
    BatteryError,
}

impl ResponseCode {
    /// Parse from the wire byte. Unknown codes are not an error at this
    /// level; callers decide what an unexpected code means.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Ack),
            0x02 => Some(Self::StateOfCharge),
            0x03 => Some(Self::Voltage),
            0x04 => Some(Self::RemainingCapacity),
            0x05 => Some(Self::Temperature),
            0x06 => Some(Self::Current),
            0x07 => Some(Self::BatteryError),
            _ => None,
        }
    }

    /// Serialize to the wire byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Ack => 0x01,
            Self::StateOfCharge => 0x02,
            Self::Voltage => 0x03,
            Self::RemainingCapacity => 0x04,
            Self::Temperature => 0x05,
            Self::Current => 0x06,
            Self::BatteryError => 0x07,
        }
    }
}

/// Battery quantities the slave can report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TelemetryKind {
    StateOfCharge,
    Voltage,
    RemainingCapacity,
    Temperature,
    Current,
}

impl TelemetryKind {
    pub const ALL: [Self; 5] = [
        Self::StateOfCharge,
        Self::Voltage,
        Self::RemainingCapacity,
        Self::Temperature,
        Self::Current,
    ];

    /// The GET_* code that queries this quantity.
    pub fn request_code(self) -> RequestCode {
        match self {
            Self::StateOfCharge => RequestCode::GetStateOfCharge,
            Self::Voltage => RequestCode::GetVoltage,
            Self::RemainingCapacity => RequestCode::GetRemainingCapacity,
            Self::Temperature => RequestCode::GetTemperature,
            Self::Current => RequestCode::GetCurrent,
        }
    }

    /// The response code a well-behaved slave answers with.
    pub fn response_code(self) -> ResponseCode {
        match self {
            Self::StateOfCharge => ResponseCode::StateOfCharge,
            Self::Voltage => ResponseCode::Voltage,
            Self::RemainingCapacity => ResponseCode::RemainingCapacity,
            Self::Temperature => ResponseCode::Temperature,
            Self::Current => ResponseCode::Current,
        }
    }

    pub fn from_request_code(code: RequestCode) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.request_code() == code)
    }

    pub fn from_response_code(code: ResponseCode) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.response_code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StateOfCharge => "state-of-charge",
            Self::Voltage => "voltage",
            Self::RemainingCapacity => "remaining-capacity",
            Self::Temperature => "temperature",
            Self::Current => "current",
        }
    }
}

impl std::fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_codes_match_wire_table() {
        let bytes: Vec<u8> = RequestCode::ALL.iter().map(|c| c.to_byte()).collect();
        assert_eq!(bytes, vec![0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A]);
    }

    #[test]
    fn request_code_byte_roundtrip() {
        for code in RequestCode::ALL {
            assert_eq!(RequestCode::from_byte(code.to_byte()).unwrap(), code);
        }
    }

    #[test]
    fn unknown_request_code() {
        let err = RequestCode::from_byte(0x01).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownRequestCode(0x01)));
        assert!(RequestCode::from_byte(0x0B).is_err());
    }

    #[test]
    fn response_codes() {
        assert_eq!(ResponseCode::from_byte(0x01), Some(ResponseCode::Ack));
        assert_eq!(ResponseCode::from_byte(0x07), Some(ResponseCode::BatteryError));
        assert_eq!(ResponseCode::from_byte(0x00), None);
        assert_eq!(ResponseCode::from_byte(0x08), None);
        assert_eq!(ResponseCode::Current.to_byte(), 0x06);
    }

    #[test]
    fn telemetry_kind_code_pairs() {
        assert_eq!(
            TelemetryKind::StateOfCharge.request_code().to_byte(),
            0x06
        );
        assert_eq!(
            TelemetryKind::StateOfCharge.response_code().to_byte(),
            0x02
        );
        assert_eq!(TelemetryKind::Current.request_code().to_byte(), 0x0A);
        assert_eq!(TelemetryKind::Current.response_code().to_byte(), 0x06);
    }

    #[test]
    fn telemetry_kind_lookup() {
        for kind in TelemetryKind::ALL {
            assert_eq!(
                TelemetryKind::from_request_code(kind.request_code()),
                Some(kind)
            );
            assert_eq!(
                TelemetryKind::from_response_code(kind.response_code()),
                Some(kind)
            );
        }
        assert_eq!(TelemetryKind::from_request_code(RequestCode::Move), None);
        assert_eq!(TelemetryKind::from_response_code(ResponseCode::Ack), None);
    }
}
