//! Stream Session
//!
//! Wraps one admitted bidirectional connection: a process-unique identity,
//! the display name bound at admission, and exclusive ownership of the
//! transport halves. No other component touches the transport directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

use super::SessionError;
use crate::protocol::Envelope;

/// Identity of one admitted session. Assigned at admission, immutable,
/// never reused after eviction.
pub type SessionId = Uuid;

/// Inbound half of a message-framed transport.
#[async_trait]
pub trait MessageStream: Send + Sync {
    /// Await one text frame. `Ok(None)` means the remote end closed.
    async fn next_text(&mut self) -> Result<Option<String>, SessionError>;
}

/// Outbound half of a message-framed transport.
#[async_trait]
pub trait MessageSink: Send {
    /// Write one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), SessionError>;

    /// Shut down the outbound half.
    async fn close(&mut self);
}

/// Cloneable handle to a session's outbound half.
///
/// Shared between the session's own task and the registry's broadcast path.
/// The inner mutex serializes writes so concurrent sends never interleave
/// frames; it is independent of the registry lock and of the receive path.
#[derive(Clone)]
pub struct Outbound {
    sink: Arc<Mutex<Box<dyn MessageSink>>>,
    closed: Arc<AtomicBool>,
    send_timeout: Duration,
}

impl Outbound {
    pub fn new(sink: Box<dyn MessageSink>, send_timeout: Duration) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            closed: Arc::new(AtomicBool::new(false)),
            send_timeout,
        }
    }

    /// Serialize and write one envelope.
    ///
    /// A peer that blocks past the send timeout is reported as a transport
    /// error so a broadcast is never stalled indefinitely by one recipient.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }

        let text = envelope.encode()?;
        let mut sink = self.sink.lock().await;
        match timeout(self.send_timeout, sink.send_text(text)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Transport(format!(
                "send timed out after {:?}",
                self.send_timeout
            ))),
        }
    }

    /// Shut down the outbound half and release its buffers.
    /// Repeated calls are no-ops after the first.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut sink = self.sink.lock().await;
        sink.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Registry-facing view of a session: identity, display name, and the
/// send half. Cheap to clone; the transport itself is not duplicated.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    username: String,
    outbound: Outbound,
}

impl SessionHandle {
    pub fn new(username: String, outbound: Outbound) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            outbound,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }
}

/// One admitted connection and its receive side.
///
/// Owned by the connection task that drives the receive loop; everything
/// the registry needs lives on the cloneable [`SessionHandle`].
pub struct StreamSession {
    handle: SessionHandle,
    inbound: Box<dyn MessageStream>,
}

impl StreamSession {
    /// Admit freshly accepted transport halves under a display name,
    /// allocating a new identity. The session is not yet registered.
    pub fn admit(
        inbound: Box<dyn MessageStream>,
        outbound: Box<dyn MessageSink>,
        username: String,
        send_timeout: Duration,
    ) -> Self {
        let outbound = Outbound::new(outbound, send_timeout);
        Self {
            handle: SessionHandle::new(username, outbound),
            inbound,
        }
    }

    pub fn id(&self) -> SessionId {
        self.handle.id()
    }

    pub fn username(&self) -> &str {
        self.handle.username()
    }

    /// Handle for registering this session and for the broadcast send path.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Block the owning task until one envelope arrives.
    ///
    /// `SessionError::Decode` reports a malformed frame without consuming
    /// the transport; the caller decides whether the session survives.
    pub async fn receive_one(&mut self) -> Result<Envelope, SessionError> {
        match self.inbound.next_text().await? {
            Some(raw) => Ok(Envelope::decode(&raw)?),
            None => Err(SessionError::Closed),
        }
    }

    /// Send one envelope to this session's peer.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), SessionError> {
        self.handle.outbound().send(envelope).await
    }

    /// Release the transport. Idempotent.
    pub async fn close(&self) {
        self.handle.outbound().close().await;
    }
}
