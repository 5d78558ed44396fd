//! Chat Wire Protocol
//!
//! The envelope format exchanged over every session, and the operation
//! codes that classify each envelope at the dispatch boundary.

pub mod constants;
pub mod types;

pub use types::{ChatMessage, Envelope, Opcode};
