use std::sync::{Arc, Mutex, MutexGuard};

use ugvlink_protocol::{Setpoints, TelemetryKind};

/// Battery readings the slave reports, one value per telemetry kind.
///
/// Each value goes on the wire as a little-endian `u16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Percent. Default: 87.
    pub state_of_charge: u16,
    /// Millivolts. Default: 12_300.
    pub voltage: u16,
    /// Milliamp-hours. Default: 4_200.
    pub remaining_capacity: u16,
    /// Degrees Celsius. Default: 25.
    pub temperature: u16,
    /// Milliamps. Default: 350.
    pub current: u16,
}

impl BatteryStatus {
    /// Reading reported for `kind`.
    pub fn value(&self, kind: TelemetryKind) -> u16 {
        match kind {
            TelemetryKind::StateOfCharge => self.state_of_charge,
            TelemetryKind::Voltage => self.voltage,
            TelemetryKind::RemainingCapacity => self.remaining_capacity,
            TelemetryKind::Temperature => self.temperature,
            TelemetryKind::Current => self.current,
        }
    }
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self {
            state_of_charge: 87,
            voltage: 12_300,
            remaining_capacity: 4_200,
            temperature: 25,
            current: 350,
        }
    }
}

#[derive(Debug)]
struct Inner {
    setpoints: Option<Setpoints>,
    moves: u64,
    battery: BatteryStatus,
    battery_fault: bool,
}

/// Shared handle to the simulated vehicle.
///
/// Cheap to clone. The serving loop updates it; anyone holding a clone can
/// watch the last setpoints or change the battery while the loop runs.
#[derive(Clone, Debug)]
pub struct SlaveState {
    inner: Arc<Mutex<Inner>>,
}

impl SlaveState {
    pub fn new(battery: BatteryStatus, battery_fault: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                setpoints: None,
                moves: 0,
                battery,
                battery_fault,
            })),
        }
    }

    /// Setpoints from the most recent accepted MOVE.
    pub fn setpoints(&self) -> Option<Setpoints> {
        self.lock().setpoints
    }

    /// Number of MOVE commands accepted so far.
    pub fn move_count(&self) -> u64 {
        self.lock().moves
    }

    /// Values currently reported to telemetry queries.
    pub fn battery(&self) -> BatteryStatus {
        self.lock().battery
    }

    /// Replace the reported values; takes effect on the next query.
    pub fn set_battery(&self, battery: BatteryStatus) {
        self.lock().battery = battery;
    }

    pub fn battery_fault(&self) -> bool {
        self.lock().battery_fault
    }

    /// While set, every telemetry query is answered with BATTERY_ERROR.
    pub fn set_battery_fault(&self, fault: bool) {
        self.lock().battery_fault = fault;
    }

    pub(crate) fn record_move(&self, setpoints: Setpoints) {
        let mut inner = self.lock();
        inner.setpoints = Some(setpoints);
        inner.moves += 1;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SlaveState {
    fn default() -> Self {
        Self::new(BatteryStatus::default(), false)
    }
}
