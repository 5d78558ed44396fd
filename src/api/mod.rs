//! HTTP + WebSocket API
//!
//! Account endpoints, server status, Prometheus export, and the WebSocket
//! upgrade route that feeds admitted connections into the session core.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::ChatApi;
pub use server::ChatServer;
