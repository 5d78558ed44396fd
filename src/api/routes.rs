//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers::*;

/// Chat server router
pub struct ChatApi;

impl ChatApi {
    /// Create the full router: versioned HTTP API plus the WebSocket route.
    pub fn create_router(state: AppState) -> Router {
        let api_routes = Router::new()
            .route("/health", get(health_check))
            .route("/status", get(get_server_status))
            .route("/metrics", get(export_metrics))
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/user", get(get_user));

        Router::new()
            .nest("/api/v1", api_routes)
            .route("/ws/:token", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_app() -> Router {
        ChatApi::create_router(AppState::new(Config::default()))
    }

    #[tokio::test]
    async fn health_endpoint_is_public() {
        let request = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_endpoint_reports_ok() {
        let request = Request::builder()
            .uri("/api/v1/status")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_exports_text() {
        let request = Request::builder()
            .uri("/api/v1/metrics")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let request = Request::builder()
            .uri("/api/v1/nope")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
