use std::time::Instant;

use tracing::{debug, error, info, trace, warn};
use ugvlink_protocol::frame::hex_dump;
use ugvlink_protocol::{
    DecodeError, Frame, Request, RequestCode, Response, ResponseCode, Transport, decode_incoming,
    encode,
};

use crate::commands::MoveOutcome;
use crate::error::{ClientError, Result};
use crate::serial::SerialTransport;
use crate::state::{LinkConfig, SessionConfig, SessionState};
use crate::stats::ExchangeStats;

/// Master side of the link to one vehicle.
///
/// Implements the session state machine:
/// `Disconnected` → `Handshaking` → `Ready`.
///
/// Every exchange is strictly request then response; `&mut self` keeps a
/// single request outstanding. When the session goes away, a stop Move is
/// sent so the vehicle never keeps driving after its master is gone.
///
/// # Example
///
/// ```no_run
/// # fn example() -> ugvlink_client::Result<()> {
/// use ugvlink_client::{LinkConfig, Session, SessionConfig, Setpoints};
///
/// let mut session = Session::open(&LinkConfig::default(), SessionConfig::default())?;
/// session.handshake()?;
/// session.move_wheels(Setpoints::new(160, 160))?;
/// println!("battery: {:?}", session.state_of_charge()?);
/// session.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
    stats: ExchangeStats,
    released: bool,
}

impl Session<SerialTransport> {
    /// Open the serial link described by `link` and wrap it in a session.
    pub fn open(link: &LinkConfig, config: SessionConfig) -> Result<Self> {
        let transport = SerialTransport::open_link(link)?;
        Self::new(transport, config)
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already open transport. Stale input is discarded; the
    /// session starts in [`SessionState::Disconnected`].
    pub fn new(mut transport: T, config: SessionConfig) -> Result<Self> {
        transport.discard_pending_input()?;
        debug!(
            master_id = config.master_id,
            peer_id = config.peer_id,
            "session created"
        );
        Ok(Self {
            transport,
            config,
            state: SessionState::Disconnected,
            stats: ExchangeStats::new(),
            released: false,
        })
    }

    /// Confirm the peer is listening by sending READY until it answers ACK.
    ///
    /// Gives up after `handshake_attempts` unanswered attempts with the fatal
    /// [`ClientError::HandshakeExhausted`] and returns to `Disconnected`.
    pub fn handshake(&mut self) -> Result<()> {
        self.state = SessionState::Handshaking;
        let attempts = self.config.handshake_attempts;
        let peer_id = self.config.peer_id;
        info!(peer_id, attempts, "handshaking");

        for attempt in 1..=attempts {
            match self.send_and_receive(RequestCode::Ready.to_byte(), &[]) {
                Ok(frame) if frame.function_code == ResponseCode::Ack.to_byte() => {
                    self.state = SessionState::Ready;
                    info!(peer_id, attempt, "peer ready");
                    return Ok(());
                }
                Ok(frame) => {
                    debug!(
                        attempt,
                        function_code = frame.function_code,
                        "READY answered without ACK"
                    );
                }
                Err(ClientError::NoResponse) => {
                    debug!(attempt, "no answer to READY");
                }
                Err(e) => {
                    self.state = SessionState::Disconnected;
                    return Err(e);
                }
            }
        }

        error!(peer_id, attempts, "peer never acknowledged READY");
        self.state = SessionState::Disconnected;
        Err(ClientError::HandshakeExhausted { peer_id, attempts })
    }

    /// Send one frame to the peer and decode exactly one frame in return.
    ///
    /// Every decode failure is logged and reported as
    /// [`ClientError::NoResponse`]. Requires [`SessionState::Ready`].
    pub fn request(&mut self, function_code: u8, payload: &[u8]) -> Result<Frame> {
        self.require_ready()?;
        self.send_and_receive(function_code, payload)
    }

    /// Typed form of [`request`](Self::request).
    pub fn exchange(&mut self, request: &Request) -> Result<Response> {
        let frame = self.request(request.code().to_byte(), &request.payload())?;
        Ok(Response::from_frame(frame))
    }

    /// Stop the vehicle and release the link.
    ///
    /// Sends the configured stop setpoints whatever the session state and
    /// reports how the peer answered. The drop-time stop is skipped
    /// afterwards.
    pub fn shutdown(mut self) -> Result<MoveOutcome> {
        self.released = true;
        let outcome = self.send_stop();
        info!(stats = %self.stats, "session closed");
        outcome
    }

    // -- State (no I/O) --

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the handshake has completed and requests may be sent.
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Configuration this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Address of the vehicle this session talks to.
    pub fn peer_id(&self) -> u8 {
        self.config.peer_id
    }

    /// Our own address; replies must be sent to it.
    pub fn master_id(&self) -> u8 {
        self.config.master_id
    }

    /// Round-trip statistics for this session.
    pub fn stats(&self) -> &ExchangeStats {
        &self.stats
    }

    // -- Private helpers --

    fn require_ready(&self) -> Result<()> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(ClientError::InvalidState {
                expected: SessionState::Ready.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    /// Move with the stop setpoints, without the state check.
    pub(crate) fn send_stop(&mut self) -> Result<MoveOutcome> {
        let stop = Request::Move(self.config.stop_setpoints);
        debug!(setpoints = ?self.config.stop_setpoints, "stopping vehicle");
        let frame = self.send_and_receive(stop.code().to_byte(), &stop.payload())?;
        Ok(crate::commands::interpret_move(&Response::from_frame(frame)))
    }

    fn send_and_receive(&mut self, function_code: u8, payload: &[u8]) -> Result<Frame> {
        let bytes = encode(
            self.config.peer_id,
            self.config.master_id,
            function_code,
            payload,
        )?;
        trace!(frame = %hex_dump(&bytes), "sending");

        // A late answer to an earlier request must not pair with this one.
        self.transport.discard_pending_input()?;
        let started = Instant::now();
        self.transport.write(&bytes)?;
        let result = decode_incoming(
            &mut self.transport,
            self.config.master_id,
            &self.config.decode,
        );
        let elapsed = started.elapsed();

        match result {
            Ok(frame) => {
                self.stats.record_success(elapsed);
                trace!(
                    function_code = frame.function_code,
                    elapsed = ?elapsed,
                    "response received"
                );
                Ok(frame)
            }
            Err(DecodeError::Transport(e)) => {
                self.stats.record_failure(elapsed);
                error!(error = %e, "link failed while awaiting response");
                Err(ClientError::Transport(e))
            }
            Err(e) => {
                self.stats.record_failure(elapsed);
                if e.is_foreign() {
                    warn!(error = %e, "message for other device");
                } else {
                    error!(error = %e, function_code, "no valid response");
                }
                Err(ClientError::NoResponse)
            }
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.send_stop() {
            warn!(error = %e, "stop on drop failed");
        }
        info!(stats = %self.stats, "session closed");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ugvlink_protocol::{MemoryTransport, Setpoints, TransportError};

    use super::*;
    use crate::mock::{PEER, ack, ready_session, reply, sent_frames};

    #[test]
    fn handshake_first_attempt() {
        let link = MemoryTransport::new();
        let mut session = Session::new(link.clone(), SessionConfig::for_peer(PEER)).unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.peer_id(), PEER);
        assert_eq!(session.master_id(), 0x01);

        link.queue_reply(&ack());
        session.handshake().unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        let frames = sent_frames(&link.take_written());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].function_code, RequestCode::Ready.to_byte());
        assert_eq!(frames[0].dest_id, PEER);
        assert_eq!(frames[0].src_id, 0x01);
        assert!(frames[0].payload.is_empty());
    }

    #[test]
    fn handshake_skips_noise_and_non_ack() {
        let link = MemoryTransport::new();
        let mut session = Session::new(link.clone(), SessionConfig::for_peer(PEER)).unwrap();

        // attempt 1: telemetry instead of ACK; attempt 2: noise then ACK
        link.queue_reply(&reply(0x02, &[50]));
        link.queue_reply(&[&[0xFF, 0x00][..], &ack()[..]].concat());
        session.handshake().unwrap();

        assert!(session.is_ready());
        assert_eq!(sent_frames(&link.take_written()).len(), 2);
    }

    #[test]
    fn handshake_exhausted() {
        let link = MemoryTransport::new();
        let mut session = Session::new(link.clone(), SessionConfig::for_peer(PEER)).unwrap();

        let err = session.handshake().unwrap_err();
        assert!(matches!(
            err,
            ClientError::HandshakeExhausted {
                peer_id: PEER,
                attempts: 10
            }
        ));
        assert!(err.is_fatal());
        assert_eq!(session.state(), SessionState::Disconnected);

        let frames = sent_frames(&link.take_written());
        assert_eq!(frames.len(), 10);
        assert!(
            frames
                .iter()
                .all(|f| f.function_code == RequestCode::Ready.to_byte())
        );
    }

    #[test]
    fn handshake_exhausted_by_non_ack_answers() {
        let link = MemoryTransport::new();
        let mut session = Session::new(link.clone(), SessionConfig::for_peer(PEER)).unwrap();
        for _ in 0..10 {
            link.queue_reply(&reply(0x02, &[50]));
        }
        // would be accepted, but only after the budget is spent
        link.queue_reply(&ack());

        let err = session.handshake().unwrap_err();
        assert!(matches!(
            err,
            ClientError::HandshakeExhausted { attempts: 10, .. }
        ));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(sent_frames(&link.take_written()).len(), 10);
        assert_eq!(session.stats().successes(), 10);
    }

    #[test]
    fn handshake_respects_attempt_budget() {
        let link = MemoryTransport::new();
        let config = SessionConfig {
            handshake_attempts: 3,
            ..SessionConfig::for_peer(PEER)
        };
        let mut session = Session::new(link.clone(), config).unwrap();

        let err = session.handshake().unwrap_err();
        assert!(matches!(
            err,
            ClientError::HandshakeExhausted { attempts: 3, .. }
        ));
        assert_eq!(sent_frames(&link.take_written()).len(), 3);
    }

    #[test]
    fn handshake_transport_failure() {
        let link = MemoryTransport::new();
        let mut session = Session::new(link.clone(), SessionConfig::for_peer(PEER)).unwrap();
        link.close();

        let err = session.handshake().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Closed)
        ));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn new_discards_stale_input() {
        let link = MemoryTransport::new();
        link.push_inbound(&ack());
        let _session = Session::new(link.clone(), SessionConfig::for_peer(PEER)).unwrap();
        assert_eq!(link.pending_inbound(), 0);
    }

    #[test]
    fn late_answer_is_dropped_before_next_request() {
        let (link, mut session) = ready_session();
        assert!(matches!(
            session.request(0x05, &[127, 127]),
            Err(ClientError::NoResponse)
        ));

        // the ACK for the move shows up after its deadline
        link.push_inbound(&ack());
        link.queue_reply(&reply(0x02, &[87]));

        let frame = session.request(0x06, &[]).unwrap();
        assert_eq!(frame.function_code, 0x02);
        assert_eq!(frame.payload, vec![87]);
        assert_eq!(link.pending_inbound(), 0);
    }

    #[test]
    fn request_before_handshake() {
        let link = MemoryTransport::new();
        let mut session = Session::new(link.clone(), SessionConfig::for_peer(PEER)).unwrap();

        let err = session.request(0x06, &[]).unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidState {
                expected: "Ready",
                actual: "Disconnected"
            }
        ));
        assert!(link.written().is_empty());

        // The drop-time stop still goes out.
        drop(session);
        assert_eq!(sent_frames(&link.written()).len(), 1);
    }

    #[test]
    fn request_returns_frame() {
        let (link, mut session) = ready_session();
        link.queue_reply(&reply(0x02, &[87]));

        let frame = session.request(0x06, &[]).unwrap();
        assert_eq!(frame.function_code, 0x02);
        assert_eq!(frame.payload, vec![87]);
        assert_eq!(frame.src_id, PEER);
        assert_eq!(session.stats().successes(), 1);
    }

    #[test]
    fn request_failures_collapse_to_no_response() {
        let (link, mut session) = ready_session();

        // nothing at all
        assert!(matches!(
            session.request(0x06, &[]),
            Err(ClientError::NoResponse)
        ));

        // corrupted end marker
        let mut bad = reply(0x02, &[87]);
        *bad.last_mut().unwrap() = 0x04;
        link.queue_reply(&bad);
        assert!(matches!(
            session.request(0x06, &[]),
            Err(ClientError::NoResponse)
        ));

        // addressed to someone else
        link.queue_reply(&encode(0x09, PEER, 0x02, &[87]).unwrap());
        assert!(matches!(
            session.request(0x06, &[]),
            Err(ClientError::NoResponse)
        ));

        // truncated length
        link.queue_reply(&[0x02, 0x01, PEER, 0x01]);
        assert!(matches!(
            session.request(0x06, &[]),
            Err(ClientError::NoResponse)
        ));

        assert!(session.is_ready());
        assert_eq!(session.stats().failures(), 4);
    }

    #[test]
    fn exchange_typed() {
        let (link, mut session) = ready_session();
        link.queue_reply(&ack());
        let response = session
            .exchange(&Request::Move(Setpoints::new(200, 50)))
            .unwrap();
        assert_eq!(response, Response::Ack);

        let frames = sent_frames(&link.take_written());
        assert_eq!(frames[0].function_code, 0x05);
        assert_eq!(frames[0].payload, vec![200, 50]);
    }

    #[test]
    fn drop_sends_stop() {
        let (link, session) = ready_session();
        drop(session);

        let frames = sent_frames(&link.written());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].function_code, RequestCode::Move.to_byte());
        assert_eq!(frames[0].payload, vec![127, 127]);
    }

    #[test]
    fn shutdown_sends_stop_once() {
        let (link, session) = ready_session();
        link.queue_reply(&ack());

        let outcome = session.shutdown().unwrap();
        assert_eq!(outcome, MoveOutcome::Accepted);

        let frames = sent_frames(&link.written());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, vec![127, 127]);
    }

    #[test]
    fn shutdown_uses_configured_stop() {
        let link = MemoryTransport::new();
        let config = SessionConfig {
            stop_setpoints: Setpoints::new(0, 0),
            ..SessionConfig::for_peer(PEER)
        };
        let session = Session::new(link.clone(), config).unwrap();

        assert!(matches!(session.shutdown(), Err(ClientError::NoResponse)));
        assert_eq!(sent_frames(&link.written())[0].payload, vec![0, 0]);
    }

    #[test]
    fn stats_track_round_trips() {
        let (link, mut session) = ready_session();
        link.queue_reply(&ack());
        session.request(0x04, &[]).unwrap();

        let stats = session.stats();
        // handshake plus one request
        assert_eq!(stats.exchanges(), 2);
        assert!(stats.mean_round_trip().unwrap() < Duration::from_secs(1));
    }
}
