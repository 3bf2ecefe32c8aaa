//! Axum-based HTTP server.

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use porter_controller::Orchestrator;
use porter_core::config::ServerConfig;
use porter_core::traits::{SpeechSynthesizer, Transcriber};
use porter_core::{Error, Result};
use porter_speech::SpeechQueueConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{chat, voice};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Origins allowed by CORS; `*` allows any.
    pub allowed_origins: Vec<String>,
    /// Enable request tracing.
    pub enable_tracing: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: vec!["*".to_string()],
            enable_tracing: true,
        }
    }
}

impl From<&ServerConfig> for GatewayConfig {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            allowed_origins: cfg.allowed_origins.clone(),
            enable_tracing: true,
        }
    }
}

/// Shared application state. Every client is built once at startup.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub speech: SpeechQueueConfig,
    /// Include the error detail string in 500 responses.
    pub expose_error_details: bool,
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route(
                "/api/chat-detailed",
                post(chat::detailed_handler).get(chat::detailed_usage_handler),
            )
            .route("/api/chat", post(chat::stream_handler))
            .route("/api/chat/raw", post(chat::raw_stream_handler))
            .route("/api/chat/spoken", post(chat::spoken_handler))
            .route("/api/voice/speak", post(voice::speak_handler))
            .route("/api/voice/transcribe", post(voice::transcribe_handler))
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        router = router.layer(cors_layer(&self.config.allowed_origins));

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::internal(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let method = req.method().clone();

    let response = next.run(req).await;

    porter_governance::track_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_config_from_server_settings() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            port: 8080,
            allowed_origins: vec!["https://ops.example.com".into()],
            expose_error_details: false,
        };
        let cfg = GatewayConfig::from(&server);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.allowed_origins.len(), 1);
    }
}
