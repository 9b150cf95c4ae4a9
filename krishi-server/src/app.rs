use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{MethodRouter, get, post},
};
use krishi_core::{Config, Providers, model::MAX_IMAGE_BYTES};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{error::ApiError, routes};

/// Room for multipart boundaries and headers around the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone, Default)]
pub struct AppState {
    pub providers: Providers,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            providers: Providers::from_config(config),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// POST-only route; every other method gets the JSON 405 body.
fn post_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: axum::handler::Handler<T, AppState>,
    T: 'static,
{
    post(handler).fallback(method_not_allowed)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post_only(routes::chat::post_chat))
        .route("/api/weather", post_only(routes::weather::post_weather))
        .route("/api/market", post_only(routes::market::post_market))
        .route(
            "/api/pest",
            post_only(routes::pest::post_pest)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/api/feedback", post_only(routes::feedback::post_feedback))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config);
    let app = build_router(state);

    let addr: SocketAddr = config
        .server
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_addr()))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_util::read_body;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_returns_ok() {
        let app = build_router(AppState::default());
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected_on_every_api_route() {
        for path in ["/api/chat", "/api/weather", "/api/market", "/api/pest", "/api/feedback"] {
            for method in ["GET", "PUT", "DELETE"] {
                let app = build_router(AppState::default());
                let resp = app
                    .oneshot(
                        Request::builder()
                            .method(method)
                            .uri(path)
                            .body(Body::empty())
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {path}");
                assert_eq!(read_body(resp).await["error"], "Method not allowed");
            }
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = build_router(AppState::default());
        let resp = app
            .oneshot(
                Request::post("/api/weather")
                    .header("Content-Type", "application/json")
                    .body(Body::from("{\"lat\": "))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_body(resp).await["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let app = build_router(AppState::default());
        let resp = app
            .oneshot(
                Request::post("/api/market")
                    .body(Body::from("{\"commodity\":\"rice\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
