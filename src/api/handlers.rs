//! API Handlers

use std::sync::Arc;
use std::time::SystemTime;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, warn};

use super::types::*;
use crate::auth::{AuthError, AuthManager};
use crate::config::Config;
use crate::connection::handle_socket;
use crate::metrics::Metrics;
use crate::session::SessionRegistry;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub auth: Arc<AuthManager>,
    pub registry: Arc<SessionRegistry>,
    pub metrics: Arc<Metrics>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub start_time: SystemTime,
}

impl AppState {
    /// Build state with its own shutdown channel. Tests and simple
    /// embeddings use this; `main` passes the coordinator's sender.
    pub fn new(config: Config) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self::with_shutdown(config, shutdown_tx)
    }

    pub fn with_shutdown(config: Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self {
            auth: Arc::new(AuthManager::new(&config)),
            registry: Arc::new(SessionRegistry::new()),
            metrics: Arc::new(Metrics::new()),
            config: Arc::new(RwLock::new(config)),
            shutdown_tx,
            start_time: SystemTime::now(),
        }
    }
}

/// Create an account
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    match state.auth.register(&request.username, &request.password) {
        Ok(account) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(CredentialsResponse::from(account))),
        )
            .into_response(),
        Err(e) => {
            let status = match e {
                AuthError::UsernameTaken => StatusCode::CONFLICT,
                AuthError::RegistrationClosed => StatusCode::FORBIDDEN,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (
                status,
                Json(ApiResponse::<CredentialsResponse>::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Validate credentials and return the account token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Response {
    let result = state.auth.login(&request.username, &request.password);
    state.metrics.record_auth_attempt(result.is_ok());

    match result {
        Ok(account) => (
            StatusCode::OK,
            Json(ApiResponse::success(CredentialsResponse::from(account))),
        )
            .into_response(),
        Err(e) => {
            let status = match e {
                AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::UNAUTHORIZED,
            };
            (
                status,
                Json(ApiResponse::<CredentialsResponse>::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Resolve a token to its account
pub async fn get_user(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Response {
    match state.auth.resolve_token(&query.token) {
        Some(username) => (
            StatusCode::OK,
            Json(ApiResponse::success(CredentialsResponse {
                username,
                token: query.token,
            })),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<CredentialsResponse>::error(
                AuthError::InvalidToken.to_string(),
            )),
        )
            .into_response(),
    }
}

/// Health check handler
pub async fn health_check() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "healthy".to_string(),
    }))
}

/// Get server status
pub async fn get_server_status(State(state): State<AppState>) -> Json<ApiResponse<ServerStatus>> {
    let uptime = SystemTime::now()
        .duration_since(state.start_time)
        .unwrap_or_default()
        .as_secs();

    let status = ServerStatus {
        uptime_seconds: uptime,
        active_sessions: state.registry.active_sessions(),
        total_sessions: state.metrics.total_sessions(),
        messages_relayed: state.metrics.messages_relayed(),
        send_failures: state.metrics.send_failures(),
        connected_users: state.registry.usernames().await,
        accounts: state.auth.stats().accounts,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(status))
}

/// Export metrics in Prometheus text format
pub async fn export_metrics(State(state): State<AppState>) -> Response {
    let enabled = state.config.read().await.monitoring.prometheus_enabled;
    if !enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match state.metrics.export() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => {
            error!("Failed to export metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// WebSocket admission: resolve the token, then upgrade.
///
/// Unknown tokens and over-limit connections are rejected before the
/// upgrade, so they never reach the registry.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Some(username) = state.auth.resolve_token(&token) else {
        warn!("WebSocket admission rejected: unknown token");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let (max_sessions, send_timeout) = {
        let config = state.config.read().await;
        (config.server.max_sessions, config.server.send_timeout)
    };

    if state.registry.active_sessions() >= max_sessions {
        warn!(
            "WebSocket admission rejected for '{}': session limit {} reached",
            username, max_sessions
        );
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let registry = Arc::clone(&state.registry);
    let metrics = Arc::clone(&state.metrics);
    let shutdown_rx = state.shutdown_tx.subscribe();
    ws.on_upgrade(move |socket| {
        handle_socket(socket, username, registry, metrics, shutdown_rx, send_timeout)
    })
}
