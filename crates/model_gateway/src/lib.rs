//! Language-Model Gateway for Porter.
//!
//! This crate provides:
//! - An OpenAI-compatible chat-completions client implementing `LlmClient`
//! - JSON mode and image content parts for vision-capable models
//! - SSE token streaming with per-chunk timeouts

pub mod config;
pub mod openai_client;
pub mod sse;

pub use config::OpenAiConfig;
pub use openai_client::OpenAiClient;

use porter_core::config::ModelGatewayConfig;

/// Create the process-wide client from application configuration.
pub fn create_client_from_config(config: &ModelGatewayConfig) -> porter_core::Result<OpenAiClient> {
    if config.api_key.is_none() {
        tracing::warn!("No model gateway API key configured; requests will be unauthenticated");
    }
    OpenAiClient::new(OpenAiConfig::from(config))
}
