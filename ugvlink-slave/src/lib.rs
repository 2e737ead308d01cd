//! Simulated vehicle answering the ugvlink serial protocol.
//!
//! Stands in for the robot's firmware in tests and bench setups: it decodes
//! frames addressed to its own id, acknowledges READY and MOVE, and reports
//! battery telemetry from a configurable [`BatteryStatus`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//!
//! use ugvlink_protocol::pipe;
//! use ugvlink_slave::{Slave, SlaveConfig};
//!
//! let (_master_end, slave_end) = pipe();
//! let mut slave = Slave::new(slave_end, SlaveConfig::default());
//! let stop = AtomicBool::new(false);
//! slave.run(&stop).unwrap();
//! ```

pub mod error;
pub(crate) mod handler;
pub mod state;

pub use error::{Result, SlaveError};
pub use state::{BatteryStatus, SlaveState};

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, trace, warn};
use ugvlink_protocol::frame::hex_dump;
use ugvlink_protocol::{
    DecodeError, DecodeOptions, Request, Transport, TransportError, decode_incoming,
};

/// Configuration for [`Slave`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlaveConfig {
    /// Our own identity; frames for any other id are ignored. Default: `0x01`.
    pub slave_id: u8,
    /// Destination of every reply. Default: `0x01`.
    pub master_id: u8,
    /// Inbound frame timing. The sync timeout also bounds how long
    /// [`Slave::run`] takes to notice its stop flag.
    pub decode: DecodeOptions,
    /// Initial telemetry values.
    pub battery: BatteryStatus,
    /// Start out reporting BATTERY_ERROR. Default: `false`.
    pub battery_fault: bool,
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self {
            slave_id: 0x01,
            master_id: 0x01,
            decode: DecodeOptions::default(),
            battery: BatteryStatus::default(),
            battery_fault: false,
        }
    }
}

/// Serves requests arriving on a [`Transport`], one at a time.
pub struct Slave<T: Transport> {
    transport: T,
    config: SlaveConfig,
    state: SlaveState,
}

impl<T: Transport> Slave<T> {
    /// Serve on `transport`, starting from the battery values in `config`.
    pub fn new(transport: T, config: SlaveConfig) -> Self {
        let state = SlaveState::new(config.battery, config.battery_fault);
        Self {
            transport,
            config,
            state,
        }
    }

    /// Shared handle to the simulated vehicle.
    pub fn state(&self) -> &SlaveState {
        &self.state
    }

    pub fn config(&self) -> &SlaveConfig {
        &self.config
    }

    /// Decode one frame and answer it.
    ///
    /// Returns the request that was answered, or `None` when nothing usable
    /// arrived (sync timeout, bad framing, foreign frame, unknown code or
    /// malformed MOVE). Only transport failures are errors.
    pub fn serve_one(&mut self) -> Result<Option<Request>> {
        let decoded = decode_incoming(
            &mut self.transport,
            self.config.slave_id,
            &self.config.decode,
        );
        let frame = match decoded {
            Ok(frame) => frame,
            Err(DecodeError::SyncTimeout(_)) => return Ok(None),
            Err(DecodeError::Transport(e)) => return Err(SlaveError::Transport(e)),
            Err(e) => {
                debug!(error = %e, "ignoring inbound bytes");
                return Ok(None);
            }
        };

        let request = match Request::parse(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    error = %e,
                    function_code = frame.function_code,
                    "unanswerable request"
                );
                return Ok(None);
            }
        };
        debug!(
            command = request.code().as_str(),
            src_id = frame.src_id,
            "received request"
        );

        let response = handler::respond(&request, &self.state);
        let bytes = response
            .to_frame(self.config.master_id, self.config.slave_id)
            .to_bytes()?;
        trace!(frame = %hex_dump(&bytes), "replying");
        self.transport.write(&bytes)?;
        Ok(Some(request))
    }

    /// Serve until `stop` is set or the link closes.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        info!(slave_id = self.config.slave_id, "slave serving");
        while !stop.load(Ordering::Relaxed) {
            match self.serve_one() {
                Ok(_) => {}
                Err(SlaveError::Transport(TransportError::Closed)) => {
                    info!("link closed");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        info!(moves = self.state.move_count(), "slave stopped");
        Ok(())
    }
}
