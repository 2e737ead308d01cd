//! Wire protocol for commanding an unmanned ground vehicle over a serial
//! radio link.
//!
//! This crate holds the pieces shared by the master (`ugvlink-client`) and
//! the simulated slave (`ugvlink-slave`): the sentinel-delimited frame codec,
//! function codes, typed requests and responses, and the [`Transport`] trait
//! the codec reads from.

pub mod codes;
pub mod command;
pub mod error;
pub mod frame;
pub mod response;
pub mod transport;

pub use codes::{RequestCode, ResponseCode, TelemetryKind};
pub use command::{Request, Setpoints, Wheel};
pub use error::{DecodeError, ProtocolError, Result, TransportError};
pub use frame::{DecodeOptions, Frame, LengthOrder, decode_incoming, encode};
pub use response::Response;
pub use transport::{MemoryTransport, PipeTransport, Transport, pipe};
