//! Scripted peer helpers for unit tests.

use std::time::Duration;

use ugvlink_protocol::{
    DecodeError, DecodeOptions, Frame, MemoryTransport, ResponseCode, decode_incoming, encode,
};

use crate::session::Session;
use crate::state::{DEFAULT_MASTER_ID, SessionConfig};

pub const PEER: u8 = 0x02;

/// Encoded slave→master frame from [`PEER`].
pub fn reply(function_code: u8, payload: &[u8]) -> Vec<u8> {
    encode(DEFAULT_MASTER_ID, PEER, function_code, payload).unwrap()
}

pub fn ack() -> Vec<u8> {
    reply(ResponseCode::Ack.to_byte(), &[])
}

/// Split the bytes a session wrote back into frames.
pub fn sent_frames(bytes: &[u8]) -> Vec<Frame> {
    let mut link = MemoryTransport::new();
    link.push_inbound(bytes);
    let options = DecodeOptions {
        sync_timeout: Duration::from_millis(10),
        byte_timeout: Duration::from_millis(10),
        ..DecodeOptions::default()
    };

    let mut frames = Vec::new();
    loop {
        match decode_incoming(&mut link, PEER, &options) {
            Ok(frame) => frames.push(frame),
            Err(DecodeError::SyncTimeout(_)) => break,
            Err(e) => panic!("session wrote a bad frame: {e}"),
        }
    }
    frames
}

/// A session to [`PEER`] that has completed its handshake, with the
/// handshake bytes already drained from the link.
pub fn ready_session() -> (MemoryTransport, Session<MemoryTransport>) {
    let link = MemoryTransport::new();
    let mut session = Session::new(link.clone(), SessionConfig::for_peer(PEER)).unwrap();
    link.queue_reply(&ack());
    session.handshake().unwrap();
    link.take_written();
    (link, session)
}
