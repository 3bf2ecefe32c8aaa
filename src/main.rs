//! Porter - conversational port-operations assistant.
//!
//! Wires the model gateway, the multi-stage orchestrator and the speech
//! providers into the HTTP gateway.

use std::sync::Arc;

use porter_controller::Orchestrator;
use porter_core::config::AppConfig;
use porter_gateway::{AppState, GatewayConfig, GatewayServer};
use porter_speech::{ElevenLabsSynthesizer, SpeechQueueConfig, WhisperTranscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    porter_governance::configure_tracing(&config.logging)?;

    tracing::info!("Starting Porter v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Metrics
    // =========================================================================
    let metrics_handle = porter_governance::setup_metrics_recorder()?;

    // =========================================================================
    // Model gateway and pipeline
    // =========================================================================
    let llm = Arc::new(porter_model_gateway::create_client_from_config(
        &config.model_gateway,
    )?);
    tracing::info!(
        base_url = %config.model_gateway.base_url,
        model = %llm.model(),
        "Model gateway initialized"
    );

    let orchestrator = Orchestrator::builder()
        .with_llm(llm)
        .with_pipeline_config(config.pipeline.clone())
        .build()?;

    // =========================================================================
    // Speech
    // =========================================================================
    if config.speech.api_key.is_none() {
        tracing::warn!("No synthesis API key configured; voice endpoints will fail");
    }
    let synthesizer = Arc::new(ElevenLabsSynthesizer::new(&config.speech)?);
    let transcriber = Arc::new(WhisperTranscriber::new(
        &config.speech,
        config.model_gateway.api_key.clone(),
    )?);
    let speech = SpeechQueueConfig::from(&config.speech);
    tracing::info!(
        max_concurrent_synthesis = speech.max_concurrent_synthesis,
        "Speech layer initialized"
    );

    // =========================================================================
    // HTTP gateway
    // =========================================================================
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        synthesizer,
        transcriber,
        speech,
        expose_error_details: config.server.expose_error_details,
    };

    let server = GatewayServer::new(GatewayConfig::from(&config.server), state)
        .with_metrics(metrics_handle);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Gateway ready"
    );
    server.run().await?;

    Ok(())
}
