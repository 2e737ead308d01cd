//! Byte channel abstraction and in-memory implementations.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::TransportError;

/// Raw byte channel underneath the codec.
///
/// The timeout passed to [`read_byte`](Self::read_byte) bounds a single byte.
/// Callers needing an end-to-end deadline accumulate elapsed time across
/// calls. Implementations never retry.
pub trait Transport {
    /// Read one byte, waiting at most `timeout`.
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError>;

    /// Write all of `bytes` and flush.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Drop any bytes already received but not yet read.
    fn discard_pending_input(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError> {
        (**self).read_byte(timeout)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn discard_pending_input(&mut self) -> Result<(), TransportError> {
        (**self).discard_pending_input()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError> {
        (**self).read_byte(timeout)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn discard_pending_input(&mut self) -> Result<(), TransportError> {
        (**self).discard_pending_input()
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    inbound: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    outbound: Vec<u8>,
    closed: bool,
}

/// Scripted in-memory transport.
///
/// Clones share the same buffers, so a test can hand one clone to a session
/// and keep another to queue inbound bytes and inspect what was written.
/// Reading from an empty queue returns [`TransportError::Timeout`] at once,
/// without sleeping.
///
/// Bytes pushed with [`push_inbound`](Self::push_inbound) are readable
/// immediately. Bytes queued with [`queue_reply`](Self::queue_reply) arrive
/// only once the next write goes out, the way a peer answers a request.
#[derive(Clone, Debug, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be returned by subsequent reads.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.lock().inbound.extend(bytes.iter().copied());
    }

    /// Queue bytes to become readable when the next write happens. Each
    /// write releases at most one queued reply.
    pub fn queue_reply(&self, bytes: &[u8]) {
        self.lock().replies.push_back(bytes.to_vec());
    }

    /// Number of queued bytes not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().outbound.clone()
    }

    /// Return and clear everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().outbound)
    }

    /// Make every further operation fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        // A panicking test thread must not hide the buffers from the others.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MemoryTransport {
    fn read_byte(&mut self, _timeout: Duration) -> Result<u8, TransportError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.inbound.pop_front().ok_or(TransportError::Timeout)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.outbound.extend_from_slice(bytes);
        if let Some(reply) = inner.replies.pop_front() {
            inner.inbound.extend(reply);
        }
        Ok(())
    }

    fn discard_pending_input(&mut self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.inbound.clear();
        Ok(())
    }
}

/// One end of an in-memory link created by [`pipe`].
///
/// Reads block for up to the requested timeout, like a serial port would.
#[derive(Debug)]
pub struct PipeTransport {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

/// Create a connected pair of in-memory endpoints.
///
/// Bytes written on one end are read from the other. Dropping an end makes
/// the peer observe [`TransportError::Closed`] once its queue is drained.
pub fn pipe() -> (PipeTransport, PipeTransport) {
    let (a_tx, b_rx) = mpsc::channel();
    let (b_tx, a_rx) = mpsc::channel();
    (
        PipeTransport { tx: a_tx, rx: a_rx },
        PipeTransport { tx: b_tx, rx: b_rx },
    )
}

impl Transport for PipeTransport {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, TransportError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => TransportError::Timeout,
            RecvTimeoutError::Disconnected => TransportError::Closed,
        })
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        for &b in bytes {
            self.tx.send(b).map_err(|_| TransportError::Closed)?;
        }
        Ok(())
    }

    fn discard_pending_input(&mut self) -> Result<(), TransportError> {
        while self.rx.try_recv().is_ok() {}
        Ok(())
    }
}
