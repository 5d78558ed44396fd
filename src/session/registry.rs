//! Session Registry
//!
//! Single source of truth for which sessions are currently reachable, and
//! the fan-out point for broadcast. A session appears in the map exactly
//! while it is eligible to receive broadcasts: admission inserts before the
//! receive loop starts, eviction removes before transport teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::stream::{SessionHandle, SessionId};
use crate::protocol::Envelope;

/// Result of one broadcast pass.
#[derive(Debug, Default, Clone)]
pub struct BroadcastOutcome {
    /// Recipients the envelope was delivered to.
    pub delivered: usize,
    /// Recipients whose send failed and were evicted.
    pub evicted: Vec<SessionId>,
}

/// Shared map of active sessions keyed by identity.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    // Count queries never take the map lock.
    active_count: AtomicUsize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Register a session for broadcast delivery.
    ///
    /// The insert is atomic with respect to in-flight broadcasts: a
    /// broadcast either fully misses or fully includes this session.
    pub async fn admit(&self, handle: SessionHandle) {
        let mut sessions = self.sessions.write().await;
        if sessions.insert(handle.id(), handle).is_none() {
            self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove the entry for `id`, returning whether it was present.
    ///
    /// Absent entries are a no-op so racing evictions (transport-error
    /// eviction vs. explicit disconnect) stay idempotent.
    pub async fn evict(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(&id).is_some() {
            self.active_count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Deliver `envelope` to every registered session except `exclude`.
    ///
    /// The recipient set is snapshotted under the read lock and the sends
    /// happen outside it, so delivery never blocks admission or eviction.
    /// A failing recipient is evicted and closed; the remaining recipients
    /// still receive, and nothing propagates back to the broadcasting task.
    pub async fn broadcast(&self, envelope: &Envelope, exclude: SessionId) -> BroadcastOutcome {
        let recipients: Vec<SessionHandle> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|handle| handle.id() != exclude)
                .cloned()
                .collect()
        };

        let mut outcome = BroadcastOutcome::default();
        for handle in recipients {
            match handle.outbound().send(envelope).await {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    warn!(
                        "send to session {} ({}) failed, evicting: {}",
                        handle.id(),
                        handle.username(),
                        e
                    );
                    self.evict(handle.id()).await;
                    handle.outbound().close().await;
                    outcome.evicted.push(handle.id());
                }
            }
        }

        debug!(
            "broadcast op {} delivered to {} sessions ({} evicted)",
            envelope.op,
            outcome.delivered,
            outcome.evicted.len()
        );
        outcome
    }

    /// Number of currently registered sessions.
    pub fn active_sessions(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Whether `id` is currently registered.
    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Display names of every registered session.
    pub async fn usernames(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions.values().map(|h| h.username().to_string()).collect()
    }

    /// Evict everything and close each transport. Used on shutdown.
    pub async fn close_all(&self) {
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.sessions.write().await;
            let drained = sessions.drain().map(|(_, handle)| handle).collect();
            self.active_count.store(0, Ordering::Relaxed);
            drained
        };

        for handle in &handles {
            handle.outbound().close().await;
        }

        if !handles.is_empty() {
            debug!("closed {} sessions on shutdown", handles.len());
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
