use ugvlink_protocol::{ProtocolError, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum SlaveError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, SlaveError>;
