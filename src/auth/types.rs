//! Account Types

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

/// Account operation failures. All are local to one request; none affect
/// other accounts or live sessions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username is already taken")]
    UsernameTaken,
    #[error("unknown token")]
    InvalidToken,
    #[error("too many failed attempts, retry later")]
    RateLimited,
    #[error("registration is disabled")]
    RegistrationClosed,
}

/// One registered account.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub username: String,
    password_hash: String,
    pub token: String,
    pub enabled: bool,
    pub created_at: Instant,
}

impl Account {
    /// Create a new account with a hashed password and a fresh token.
    pub fn new(username: String, password: &str, enabled: bool) -> Self {
        Self {
            username,
            password_hash: Self::hash_password(password),
            token: Uuid::new_v4().to_string(),
            enabled,
            created_at: Instant::now(),
        }
    }

    /// Hash a password (simple implementation for now)
    fn hash_password(password: &str) -> String {
        // TODO: Use proper password hashing like bcrypt
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        password.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    /// Verify a password against the stored hash
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash == Self::hash_password(password)
    }
}

/// In-memory account store with a token index for admission lookups.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>, // token -> username
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account, keeping the token index in sync.
    pub fn insert(&mut self, account: Account) {
        self.tokens.insert(account.token.clone(), account.username.clone());
        self.accounts.insert(account.username.clone(), account);
    }

    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.accounts.contains_key(username)
    }

    /// Resolve a token to a username, if the token belongs to an enabled
    /// account.
    pub fn username_for_token(&self, token: &str) -> Option<&str> {
        let username = self.tokens.get(token)?;
        let account = self.accounts.get(username)?;
        account.enabled.then_some(account.username.as_str())
    }

    /// Validate user credentials
    pub fn validate_credentials(&self, username: &str, password: &str) -> bool {
        if let Some(account) = self.get(username) {
            account.enabled && account.verify_password(password)
        } else {
            false
        }
    }

    /// Load preseeded accounts from configuration.
    pub fn load_from_config(&mut self, users: &[crate::config::UserConfig]) {
        for user_config in users {
            self.insert(Account::new(
                user_config.username.clone(),
                &user_config.password,
                user_config.enabled,
            ));
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Rate limiting information for failed login attempts
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub attempts: u32,
    pub last_attempt: Instant,
    pub blocked_until: Option<Instant>,
}

impl RateLimitInfo {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            last_attempt: Instant::now(),
            blocked_until: None,
        }
    }

    /// Record a failed login attempt.
    ///
    /// A few typos are free; sustained failure earns progressive delays.
    pub fn record_failure(&mut self) {
        self.attempts += 1;
        self.last_attempt = Instant::now();

        let delay = match self.attempts {
            1..=3 => None,
            4..=6 => Some(Duration::from_secs(5)),
            7..=10 => Some(Duration::from_secs(30)),
            _ => Some(Duration::from_secs(300)),
        };

        self.blocked_until = delay.map(|d| self.last_attempt + d);
    }

    /// Reset after a successful login.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.blocked_until = None;
    }

    /// Check if currently blocked
    pub fn is_blocked(&self) -> bool {
        if let Some(blocked_until) = self.blocked_until {
            Instant::now() < blocked_until
        } else {
            false
        }
    }
}

impl Default for RateLimitInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verification_round_trips() {
        let account = Account::new("alice".into(), "hunter2", true);
        assert!(account.verify_password("hunter2"));
        assert!(!account.verify_password("hunter3"));
    }

    #[test]
    fn token_resolution_respects_enabled_flag() {
        let mut store = AccountStore::new();
        let enabled = Account::new("alice".into(), "pw", true);
        let disabled = Account::new("mallory".into(), "pw", false);
        let alice_token = enabled.token.clone();
        let mallory_token = disabled.token.clone();
        store.insert(enabled);
        store.insert(disabled);

        assert_eq!(store.username_for_token(&alice_token), Some("alice"));
        assert_eq!(store.username_for_token(&mallory_token), None);
        assert_eq!(store.username_for_token("no-such-token"), None);
    }

    #[test]
    fn credentials_require_enabled_account() {
        let mut store = AccountStore::new();
        store.insert(Account::new("alice".into(), "pw", true));
        store.insert(Account::new("mallory".into(), "pw", false));

        assert!(store.validate_credentials("alice", "pw"));
        assert!(!store.validate_credentials("alice", "wrong"));
        assert!(!store.validate_credentials("mallory", "pw"));
        assert!(!store.validate_credentials("nobody", "pw"));
    }

    #[test]
    fn rate_limit_blocks_after_repeated_failures() {
        let mut info = RateLimitInfo::new();
        for _ in 0..3 {
            info.record_failure();
        }
        assert!(!info.is_blocked());

        info.record_failure();
        assert!(info.is_blocked());

        info.reset();
        assert!(!info.is_blocked());
        assert_eq!(info.attempts, 0);
    }
}
