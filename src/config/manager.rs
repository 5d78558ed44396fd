//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(bind_addr) = std::env::var("CHATRELAY_BIND_ADDR") {
            config.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid CHATRELAY_BIND_ADDR: {}", bind_addr))?;
        }

        if let Ok(max_sessions) = std::env::var("CHATRELAY_MAX_SESSIONS") {
            config.server.max_sessions = max_sessions
                .parse::<usize>()
                .with_context(|| format!("Invalid CHATRELAY_MAX_SESSIONS: {}", max_sessions))?;
        }

        if let Ok(send_timeout) = std::env::var("CHATRELAY_SEND_TIMEOUT") {
            config.server.send_timeout = humantime::parse_duration(&send_timeout)
                .with_context(|| format!("Invalid CHATRELAY_SEND_TIMEOUT: {}", send_timeout))?;
        }

        if let Ok(open_registration) = std::env::var("CHATRELAY_OPEN_REGISTRATION") {
            config.auth.open_registration = open_registration
                .parse::<bool>()
                .with_context(|| format!("Invalid CHATRELAY_OPEN_REGISTRATION: {}", open_registration))?;
        }

        if let Ok(log_level) = std::env::var("CHATRELAY_LOG_LEVEL") {
            config.monitoring.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_auth_config()
            .with_context(|| "Account configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    /// Validate server configuration
    fn validate_server_config(&self) -> Result<()> {
        if self.server.max_sessions == 0 {
            bail!("max_sessions must be greater than 0");
        }

        if self.server.max_sessions > 100000 {
            bail!("max_sessions cannot exceed 100,000 for safety");
        }

        if self.server.send_timeout.as_millis() == 0 {
            bail!("send_timeout must be greater than 0");
        }

        if self.server.send_timeout > std::time::Duration::from_secs(60) {
            bail!("send_timeout cannot exceed 1 minute");
        }

        if self.server.shutdown_timeout.as_secs() == 0 {
            bail!("shutdown_timeout must be greater than 0");
        }

        Ok(())
    }

    /// Validate account configuration
    fn validate_auth_config(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for user in &self.auth.users {
            if user.username.is_empty() {
                bail!("preseeded account username cannot be empty");
            }
            if user.password.is_empty() {
                bail!("preseeded account '{}' has an empty password", user.username);
            }
            if !seen.insert(user.username.as_str()) {
                bail!("duplicate preseeded account '{}'", user.username);
            }
        }
        Ok(())
    }

    /// Validate monitoring configuration
    fn validate_monitoring_config(&self) -> Result<()> {
        match self.monitoring.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => bail!("invalid log_level '{}'", other),
        }
    }

    /// Apply CLI argument overrides (highest priority)
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        max_sessions: Option<usize>,
    ) {
        if let Some(bind) = bind {
            if let Ok(addr) = bind.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
            } else if let Ok(ip) = bind.parse::<std::net::IpAddr>() {
                self.server.bind_addr = SocketAddr::new(ip, self.server.bind_addr.port());
            } else {
                tracing::warn!("Ignoring unparseable --bind value: {}", bind);
            }
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
        }

        if let Some(max_sessions) = max_sessions {
            self.server.max_sessions = max_sessions;
        }
    }
}
