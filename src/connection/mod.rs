//! Connection Handling
//!
//! WebSocket-facing glue around the session core: transport adapters for
//! the upgraded socket halves and the per-connection lifecycle task.

pub mod handler;
pub mod transport;

pub use handler::handle_socket;
