//! Per-Connection Lifecycle
//!
//! Drives one admitted WebSocket: registration, the receive loop, message
//! dispatch, and eviction paired with transport teardown. Each connection
//! runs as its own tokio task; nothing here blocks any other session.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::transport::split_socket;
use crate::metrics::Metrics;
use crate::protocol::{Envelope, Opcode};
use crate::session::{SessionError, SessionId, SessionRegistry, StreamSession};

/// Run one connection to completion.
///
/// Admission inserts into the registry before the first receive; on exit
/// the session is evicted strictly before its transport is torn down, so a
/// concurrent broadcast never picks up a half-closed handle.
pub async fn handle_socket(
    socket: WebSocket,
    username: String,
    registry: Arc<SessionRegistry>,
    metrics: Arc<Metrics>,
    mut shutdown_rx: broadcast::Receiver<()>,
    send_timeout: Duration,
) {
    let (inbound, outbound) = split_socket(socket);
    let mut session = StreamSession::admit(
        Box::new(inbound),
        Box::new(outbound),
        username,
        send_timeout,
    );
    let id = session.id();

    registry.admit(session.handle()).await;
    metrics.record_session_opened();
    info!(
        "session {} ({}) joined, {} active",
        id,
        session.username(),
        registry.active_sessions()
    );

    loop {
        tokio::select! {
            received = session.receive_one() => match received {
                Ok(envelope) => dispatch(envelope, id, &registry, &metrics).await,
                Err(SessionError::Decode(e)) => {
                    // One bad frame is not fatal to the transport.
                    warn!("session {} sent a malformed envelope: {}", id, e);
                }
                Err(SessionError::Closed) => {
                    debug!("session {} disconnected", id);
                    break;
                }
                Err(SessionError::Transport(e)) => {
                    warn!("session {} transport error: {}", id, e);
                    break;
                }
            },
            _ = shutdown_rx.recv() => {
                debug!("session {} closing for shutdown", id);
                break;
            }
        }
    }

    registry.evict(id).await;
    session.close().await;
    metrics.record_session_closed();
    info!(
        "session {} ({}) left, {} active",
        id,
        session.username(),
        registry.active_sessions()
    );
}

/// Decode an envelope's operation code and apply its effect.
pub(crate) async fn dispatch(
    envelope: Envelope,
    sender: SessionId,
    registry: &SessionRegistry,
    metrics: &Metrics,
) {
    match envelope.opcode() {
        Opcode::Message => {
            let chat = match envelope.chat_payload() {
                Ok(chat) => chat,
                Err(e) => {
                    warn!("session {} sent op {} with a bad payload: {}", sender, envelope.op, e);
                    return;
                }
            };

            debug!("relaying message from {} (session {})", chat.author, sender);
            let outcome = registry.broadcast(&envelope, sender).await;
            metrics.record_broadcast(outcome.delivered, outcome.evicted.len());
        }
        Opcode::Unknown(code) => {
            // Forward compatibility: peers on other versions are ignored,
            // not disconnected.
            debug!("session {} sent unknown op {}, ignoring", sender, code);
        }
    }
}
