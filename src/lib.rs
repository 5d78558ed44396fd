//! ChatRelay Library
//!
//! Real-time chat relay server: account management over HTTP and a
//! WebSocket broadcast core that fans each message out to every other
//! connected session.

pub mod api;
pub mod auth;
pub mod config;
pub mod connection;
pub mod metrics;
pub mod protocol;
pub mod session;
pub mod shutdown;

pub use config::Config;
pub use session::{SessionRegistry, StreamSession};
pub use shutdown::ShutdownCoordinator;

/// Common error type for the relay server
pub type Result<T> = anyhow::Result<T>;
