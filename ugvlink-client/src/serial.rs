use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info, warn};
use ugvlink_protocol::{Transport, TransportError};

use crate::error::{ClientError, Result};
use crate::state::LinkConfig;

const USB_SERIAL_PREFIX: &str = "/dev/ttyUSB";

/// [`Transport`] over a serial port (the radio module's USB adapter).
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialTransport {
    /// Open `path` at `baud_rate`, 8N1 without flow control, and discard
    /// anything already sitting in the input buffer.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        debug!(path, baud_rate, "opening serial port");
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(500))
            .open()
            .map_err(|source| ClientError::Open {
                path: path.to_owned(),
                source,
            })?;

        let mut transport = Self {
            port,
            path: path.to_owned(),
        };
        transport.discard_pending_input()?;
        info!(path, baud_rate, "serial port open");
        Ok(transport)
    }

    /// Open the configured port, or the first detected one.
    pub fn open_link(config: &LinkConfig) -> Result<Self> {
        let path = match &config.port {
            Some(path) => path.clone(),
            None => detect_port()?,
        };
        Self::open(&path, config.baud_rate)
    }

    /// Device path this transport was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self, timeout: Duration) -> std::result::Result<u8, TransportError> {
        if self.port.timeout() != timeout {
            self.port
                .set_timeout(timeout)
                .map_err(|e| TransportError::Io(e.into()))?;
        }

        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(1) => Ok(buf[0]),
            Ok(_) => Err(TransportError::Timeout),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(TransportError::Timeout),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> std::result::Result<(), TransportError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn discard_pending_input(&mut self) -> std::result::Result<(), TransportError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| TransportError::Io(e.into()))
    }
}

/// First `/dev/ttyUSB*` device, in name order.
pub fn detect_port() -> Result<String> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!(error = %e, "serial port enumeration failed");
            return Err(ClientError::NoSerialPort);
        }
    };
    let found = pick_usb_port(ports.into_iter().map(|p| p.port_name));
    match &found {
        Some(path) => debug!(path, "detected serial port"),
        None => warn!("no serial port detected"),
    }
    found.ok_or(ClientError::NoSerialPort)
}

fn pick_usb_port(names: impl Iterator<Item = String>) -> Option<String> {
    names.filter(|n| n.starts_with(USB_SERIAL_PREFIX)).min()
}
