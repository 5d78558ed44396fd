//! Metrics Module
//!
//! Prometheus series for sessions, broadcasts, and logins, mirrored by
//! internal counters the status endpoint reads without an encoder pass.

pub mod collector;

pub use collector::Metrics;
