//! Metrics Collector

use std::sync::atomic::{AtomicU64, Ordering};

use prometheus::{Counter, Encoder, Gauge, Registry, TextEncoder};

use crate::Result;

/// Collects server metrics for Prometheus export and the status endpoint.
pub struct Metrics {
    registry: Registry,

    // Prometheus metrics
    sessions_total: Counter,
    active_sessions: Gauge,
    messages_relayed_total: Counter,
    broadcast_deliveries_total: Counter,
    send_failures_total: Counter,
    auth_attempts_total: Counter,
    auth_failures_total: Counter,

    // Internal counters
    total_sessions: AtomicU64,
    messages_relayed: AtomicU64,
    send_failures: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let registry = Registry::new();

        let sessions_total = Counter::new(
            "chatrelay_sessions_total",
            "Total number of admitted sessions",
        )
        .expect("Failed to create sessions_total counter");

        let active_sessions = Gauge::new(
            "chatrelay_active_sessions",
            "Number of currently registered sessions",
        )
        .expect("Failed to create active_sessions gauge");

        let messages_relayed_total = Counter::new(
            "chatrelay_messages_relayed_total",
            "Total number of chat messages fanned out",
        )
        .expect("Failed to create messages_relayed_total counter");

        let broadcast_deliveries_total = Counter::new(
            "chatrelay_broadcast_deliveries_total",
            "Total per-recipient broadcast deliveries",
        )
        .expect("Failed to create broadcast_deliveries_total counter");

        let send_failures_total = Counter::new(
            "chatrelay_send_failures_total",
            "Broadcast sends that failed and evicted the recipient",
        )
        .expect("Failed to create send_failures_total counter");

        let auth_attempts_total = Counter::new(
            "chatrelay_auth_attempts_total",
            "Total login attempts",
        )
        .expect("Failed to create auth_attempts_total counter");

        let auth_failures_total = Counter::new(
            "chatrelay_auth_failures_total",
            "Failed login attempts",
        )
        .expect("Failed to create auth_failures_total counter");

        for metric in [
            &sessions_total,
            &messages_relayed_total,
            &broadcast_deliveries_total,
            &send_failures_total,
            &auth_attempts_total,
            &auth_failures_total,
        ] {
            registry
                .register(Box::new(metric.clone()))
                .expect("Failed to register counter");
        }
        registry
            .register(Box::new(active_sessions.clone()))
            .expect("Failed to register active_sessions gauge");

        Self {
            registry,
            sessions_total,
            active_sessions,
            messages_relayed_total,
            broadcast_deliveries_total,
            send_failures_total,
            auth_attempts_total,
            auth_failures_total,
            total_sessions: AtomicU64::new(0),
            messages_relayed: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
        }
    }

    /// Record a session entering the registry
    pub fn record_session_opened(&self) {
        self.sessions_total.inc();
        self.active_sessions.inc();
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session eviction
    pub fn record_session_closed(&self) {
        self.active_sessions.dec();
    }

    /// Record one broadcast pass
    pub fn record_broadcast(&self, delivered: usize, failures: usize) {
        self.messages_relayed_total.inc();
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
        self.broadcast_deliveries_total.inc_by(delivered as f64);
        if failures > 0 {
            self.send_failures_total.inc_by(failures as f64);
            self.send_failures.fetch_add(failures as u64, Ordering::Relaxed);
        }
    }

    /// Record a login attempt
    pub fn record_auth_attempt(&self, success: bool) {
        self.auth_attempts_total.inc();
        if !success {
            self.auth_failures_total.inc();
        }
    }

    /// Export all metrics in Prometheus text format
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn total_sessions(&self) -> u64 {
        self.total_sessions.load(Ordering::Relaxed)
    }

    pub fn messages_relayed(&self) -> u64 {
        self.messages_relayed.load(Ordering::Relaxed)
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
