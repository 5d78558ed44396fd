//! Session Core
//!
//! One `StreamSession` per connected party, and the shared `SessionRegistry`
//! that fans broadcasts out to everyone else.

pub mod registry;
pub mod stream;

pub use registry::{BroadcastOutcome, SessionRegistry};
pub use stream::{MessageSink, MessageStream, Outbound, SessionHandle, SessionId, StreamSession};

use thiserror::Error;

/// Failures on one session's transport or decode path.
///
/// `Decode` is local to a single frame and need not end the session;
/// `Closed` and `Transport` always do.
#[derive(Debug, Error)]
pub enum SessionError {
    /// I/O failure on this session's transport.
    #[error("transport error: {0}")]
    Transport(String),
    /// The remote end disconnected, orderly or abrupt.
    #[error("transport closed")]
    Closed,
    /// The frame was not a well-formed envelope.
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
pub(crate) mod testing {
    //! Channel-backed fake transports for exercising the core without sockets.

    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::stream::{MessageSink, Outbound, SessionHandle};
    use super::SessionError;

    pub struct FakeSink {
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl MessageSink for FakeSink {
        async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
            self.tx
                .send(text)
                .map_err(|_| SessionError::Transport("peer went away".into()))
        }

        async fn close(&mut self) {}
    }

    /// A registered-session handle whose sends land on the returned receiver.
    /// Dropping the receiver makes every later send fail, which models a
    /// transport that was torn down externally.
    pub fn fake_handle(username: &str) -> (SessionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbound = Outbound::new(Box::new(FakeSink { tx }), Duration::from_secs(1));
        (SessionHandle::new(username.to_string(), outbound), rx)
    }
}
