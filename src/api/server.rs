//! API Server

use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::{handlers::AppState, routes::ChatApi};
use crate::Result;

/// Serves the HTTP API and WebSocket endpoint.
pub struct ChatServer {
    bind_addr: SocketAddr,
    state: AppState,
}

impl ChatServer {
    /// Create a new chat server
    pub fn new(bind_addr: SocketAddr, state: AppState) -> Self {
        Self { bind_addr, state }
    }

    /// Start serving until the shutdown future resolves.
    pub async fn start_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let app = ChatApi::create_router(self.state);

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind chat server to {}", self.bind_addr))?;

        info!("Chat server listening on {}", self.bind_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Chat server error")?;

        Ok(())
    }

    /// Start serving until the process ends.
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Create a router for testing
    pub fn create_test_router(&self) -> Router {
        ChatApi::create_router(self.state.clone())
    }
}
