//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub monitoring: MonitoringConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_sessions: usize,
    #[serde(with = "humantime_serde")]
    pub send_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Account configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Whether new accounts may be created over the API.
    pub open_registration: bool,
    /// Accounts available at startup without registering.
    pub users: Vec<UserConfig>,
}

/// Preseeded account configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
    pub enabled: bool,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub prometheus_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "127.0.0.1:8080".parse().unwrap(),
                max_sessions: 1024,
                send_timeout: Duration::from_secs(10),
                shutdown_timeout: Duration::from_secs(30),
            },
            auth: AuthConfig {
                open_registration: true,
                users: vec![],
            },
            monitoring: MonitoringConfig {
                log_level: "info".to_string(),
                prometheus_enabled: true,
            },
        }
    }
}
