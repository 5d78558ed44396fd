//! Account Manager

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::types::{Account, AccountStore, AuthError, RateLimitInfo};
use crate::config::Config;

/// Manages accounts, login validation, and token resolution.
pub struct AuthManager {
    store: Arc<Mutex<AccountStore>>,
    user_rate_limits: Arc<Mutex<HashMap<String, RateLimitInfo>>>,
    open_registration: bool,
}

impl AuthManager {
    /// Create a new account manager, preseeded from configuration.
    pub fn new(config: &Config) -> Self {
        let mut store = AccountStore::new();
        store.load_from_config(&config.auth.users);
        if !store.is_empty() {
            info!("Preseeded {} accounts from configuration", store.len());
        }

        Self {
            store: Arc::new(Mutex::new(store)),
            user_rate_limits: Arc::new(Mutex::new(HashMap::new())),
            open_registration: config.auth.open_registration,
        }
    }

    /// Create an account and issue its token.
    pub fn register(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        if !self.open_registration {
            return Err(AuthError::RegistrationClosed);
        }
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let mut store = self.store.lock().unwrap();
        if store.contains(username) {
            debug!("Registration rejected, username '{}' taken", username);
            return Err(AuthError::UsernameTaken);
        }

        let account = Account::new(username.to_string(), password, true);
        store.insert(account.clone());
        info!("Registered account '{}'", username);
        Ok(account)
    }

    /// Validate credentials and return the account (including its token).
    ///
    /// Failed attempts feed per-user progressive-delay rate limiting.
    pub fn login(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        if self.is_rate_limited(username) {
            warn!("Rate limited login attempt for '{}'", username);
            return Err(AuthError::RateLimited);
        }

        let store = self.store.lock().unwrap();
        if store.validate_credentials(username, password) {
            let account = store
                .get(username)
                .cloned()
                .ok_or(AuthError::InvalidCredentials)?;
            drop(store);

            info!("Successful login for '{}'", username);
            self.reset_rate_limit(username);
            Ok(account)
        } else {
            drop(store);
            warn!("Failed login for '{}'", username);
            self.record_login_failure(username);
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Resolve a token to a username. This is the identity-resolution call
    /// that gates session admission; `None` aborts the admission.
    pub fn resolve_token(&self, token: &str) -> Option<String> {
        let store = self.store.lock().unwrap();
        store.username_for_token(token).map(str::to_string)
    }

    /// Check if a user is currently rate limited
    fn is_rate_limited(&self, username: &str) -> bool {
        let limits = self.user_rate_limits.lock().unwrap();
        limits.get(username).map(RateLimitInfo::is_blocked).unwrap_or(false)
    }

    /// Record a login failure for rate limiting
    fn record_login_failure(&self, username: &str) {
        let mut limits = self.user_rate_limits.lock().unwrap();
        limits
            .entry(username.to_string())
            .or_insert_with(RateLimitInfo::new)
            .record_failure();
    }

    /// Reset rate limiting after a successful login
    fn reset_rate_limit(&self, username: &str) {
        let mut limits = self.user_rate_limits.lock().unwrap();
        if let Some(info) = limits.get_mut(username) {
            info.reset();
        }
    }

    /// Drop rate-limit entries that have gone quiet.
    pub fn cleanup_expired(&self) {
        let cutoff = std::time::Instant::now() - Duration::from_secs(3600);
        let mut limits = self.user_rate_limits.lock().unwrap();
        limits.retain(|_, info| info.last_attempt > cutoff || info.is_blocked());
    }

    /// Get account statistics
    pub fn stats(&self) -> AuthStats {
        let store = self.store.lock().unwrap();
        let limits = self.user_rate_limits.lock().unwrap();
        AuthStats {
            accounts: store.len(),
            rate_limited_users: limits.values().filter(|i| i.is_blocked()).count(),
        }
    }
}

/// Account statistics
#[derive(Debug, Clone)]
pub struct AuthStats {
    pub accounts: usize,
    pub rate_limited_users: usize,
}
