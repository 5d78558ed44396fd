//! API Types

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::auth::Account;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: SystemTime,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: SystemTime::now(),
        }
    }
}

/// Account creation request
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Login request
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Credentials returned by register, login, and token resolution.
#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsResponse {
    pub username: String,
    pub token: String,
}

impl From<Account> for CredentialsResponse {
    fn from(account: Account) -> Self {
        Self {
            username: account.username,
            token: account.token,
        }
    }
}

/// Token resolution query
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Health check result
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Server status information
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerStatus {
    pub uptime_seconds: u64,
    pub active_sessions: usize,
    pub total_sessions: u64,
    pub messages_relayed: u64,
    pub send_failures: u64,
    pub connected_users: Vec<String>,
    pub accounts: usize,
    pub version: String,
}
