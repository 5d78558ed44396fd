//! WebSocket Transport Adapters
//!
//! Implements the session core's message-framed transport traits over the
//! two halves of an upgraded axum WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use crate::session::{MessageSink, MessageStream, SessionError};

/// Inbound half of an upgraded WebSocket.
pub struct WsInbound {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl MessageStream for WsInbound {
    async fn next_text(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                // Ping/pong is answered by axum; binary frames are not part
                // of the protocol.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
                None => return Ok(None),
            }
        }
    }
}

/// Outbound half of an upgraded WebSocket.
pub struct WsOutbound {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl MessageSink for WsOutbound {
    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        // Best-effort close frame; the peer may already be gone.
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

/// Split an upgraded socket into the halves the session core consumes.
pub fn split_socket(socket: WebSocket) -> (WsInbound, WsOutbound) {
    let (sink, stream) = socket.split();
    (WsInbound { stream }, WsOutbound { sink })
}
