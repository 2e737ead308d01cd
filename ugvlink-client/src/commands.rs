use tracing::{debug, warn};
use ugvlink_protocol::{Request, Response, Setpoints, TelemetryKind, Transport};

use crate::error::{ClientError, Result};
use crate::session::Session;

/// How the peer answered a Move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The peer answered ACK.
    Accepted,
    /// The peer answered with anything else.
    Rejected,
}

/// Result of one telemetry query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryReading {
    /// The matching telemetry code came back; `raw` is the payload as sent.
    Value { kind: TelemetryKind, raw: Vec<u8> },
    /// The slave reported BATTERY_ERROR.
    BatteryFault,
    /// No valid or matching answer.
    Unavailable,
}

impl TelemetryReading {
    /// The raw payload read as a little-endian unsigned integer.
    ///
    /// `None` unless this is a value of 1 to 4 bytes.
    pub fn as_u32(&self) -> Option<u32> {
        let Self::Value { raw, .. } = self else {
            return None;
        };
        if raw.is_empty() || raw.len() > 4 {
            return None;
        }
        Some(
            raw.iter()
                .rev()
                .fold(0u32, |acc, b| (acc << 8) | u32::from(*b)),
        )
    }

    /// Whether the slave answered BATTERY_ERROR.
    pub fn is_battery_fault(&self) -> bool {
        matches!(self, Self::BatteryFault)
    }
}

impl<T: Transport> Session<T> {
    /// Drive both wheels at the given setpoints.
    pub fn move_wheels(&mut self, setpoints: Setpoints) -> Result<MoveOutcome> {
        debug!(right = setpoints.right, left = setpoints.left, "MOVE");
        let response = self.exchange(&Request::Move(setpoints))?;
        let outcome = interpret_move(&response);
        if outcome == MoveOutcome::Rejected {
            warn!(function_code = response.function_code(), "move not acknowledged");
        }
        Ok(outcome)
    }

    /// Move with the configured stop setpoints.
    pub fn stop(&mut self) -> Result<MoveOutcome> {
        let stop = self.config().stop_setpoints;
        self.move_wheels(stop)
    }

    /// Ask the slave for one telemetry value.
    pub fn query(&mut self, kind: TelemetryKind) -> Result<TelemetryReading> {
        debug!(%kind, "telemetry query");
        let response = self.exchange(&Request::Telemetry(kind))?;
        let reading = interpret_telemetry(kind, response);
        if reading.is_battery_fault() {
            warn!(%kind, "slave reported a battery error");
        }
        Ok(reading)
    }

    /// Query the state of charge, in percent.
    pub fn state_of_charge(&mut self) -> Result<TelemetryReading> {
        self.query(TelemetryKind::StateOfCharge)
    }

    /// Query the battery voltage.
    pub fn voltage(&mut self) -> Result<TelemetryReading> {
        self.query(TelemetryKind::Voltage)
    }

    /// Query the remaining battery capacity.
    pub fn remaining_capacity(&mut self) -> Result<TelemetryReading> {
        self.query(TelemetryKind::RemainingCapacity)
    }

    /// Query the battery temperature.
    pub fn temperature(&mut self) -> Result<TelemetryReading> {
        self.query(TelemetryKind::Temperature)
    }

    /// Query the battery current.
    pub fn current(&mut self) -> Result<TelemetryReading> {
        self.query(TelemetryKind::Current)
    }

    /// Query every telemetry kind in turn.
    ///
    /// A kind that gets no valid answer is reported as
    /// [`TelemetryReading::Unavailable`]; other errors abort the snapshot.
    pub fn telemetry_snapshot(&mut self) -> Result<Vec<(TelemetryKind, TelemetryReading)>> {
        let mut readings = Vec::with_capacity(TelemetryKind::ALL.len());
        for kind in TelemetryKind::ALL {
            let reading = match self.query(kind) {
                Ok(reading) => reading,
                Err(ClientError::NoResponse) => TelemetryReading::Unavailable,
                Err(e) => return Err(e),
            };
            readings.push((kind, reading));
        }
        Ok(readings)
    }
}

pub(crate) fn interpret_move(response: &Response) -> MoveOutcome {
    match response {
        Response::Ack => MoveOutcome::Accepted,
        _ => MoveOutcome::Rejected,
    }
}

fn interpret_telemetry(kind: TelemetryKind, response: Response) -> TelemetryReading {
    match response {
        Response::Telemetry { kind: got, payload } if got == kind => {
            TelemetryReading::Value { kind, raw: payload }
        }
        Response::BatteryError => TelemetryReading::BatteryFault,
        other => {
            debug!(
                %kind,
                function_code = other.function_code(),
                "unexpected answer to telemetry query"
            );
            TelemetryReading::Unavailable
        }
    }
}
