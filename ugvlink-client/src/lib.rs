//! Master side of the ugvlink serial protocol.
//!
//! Open the radio link, confirm the vehicle is listening, then drive it and
//! read its battery telemetry. Every exchange is a blocking request followed
//! by exactly one response.
//!
//! # Example
//!
//! ```no_run
//! # fn example() -> ugvlink_client::Result<()> {
//! use ugvlink_client::{LinkConfig, Session, SessionConfig, Setpoints};
//!
//! let link = LinkConfig {
//!     port: Some("/dev/ttyUSB0".into()),
//!     ..LinkConfig::default()
//! };
//! let mut session = Session::open(&link, SessionConfig::for_peer(0x01))?;
//! session.handshake()?;
//! session.move_wheels(Setpoints::try_from_f64(180.0, 180.0)?)?;
//! for (kind, reading) in session.telemetry_snapshot()? {
//!     println!("{kind}: {reading:?}");
//! }
//! // Dropping the session stops the vehicle.
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;
pub mod serial;
pub mod session;
pub mod state;
pub mod stats;

pub use commands::{MoveOutcome, TelemetryReading};
pub use error::{ClientError, Result};
pub use serial::{SerialTransport, detect_port};
pub use session::Session;
pub use state::{LinkConfig, SessionConfig, SessionState};
pub use stats::ExchangeStats;
pub use ugvlink_protocol::{DecodeOptions, LengthOrder, Setpoints, TelemetryKind, Transport};
